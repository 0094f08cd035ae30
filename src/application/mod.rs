pub mod todo_form;
pub mod todo_service;
