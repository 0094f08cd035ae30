use todo_web::{application::todo_service::TodoServiceImpl, http::routing, http::routing::todos, infrastructure::sqlite_repo::SqliteTodoRepository};
use todo_web::domain::{repository::TodoRepository, todo::{Todo, TodoFilter}};
use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::Router;

async fn setup() -> (Router, SqliteTodoRepository) {
    // use in-memory sqlite for tests
    let repo = SqliteTodoRepository::connect("sqlite::memory:").await.unwrap();
    repo.init().await.unwrap();
    let service = TodoServiceImpl::new(repo.clone());
    let app: Router = routing::app(todos::router(todos::AppState { service }));
    (app, repo)
}

async fn all(repo: &SqliteTodoRepository) -> Vec<Todo> { repo.list(TodoFilter::All).await.unwrap() }

#[tokio::test]
async fn acceptance_create_list_edit_toggle_delete() {
    let (app, repo) = setup().await;

    // create
    let res = request(&app, "POST", "/new", Some("title=Test&description=First&due_date=2025-12-31"), &[]).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
    let created = all(&repo).await.pop().unwrap();
    assert_eq!(created.title, "Test");
    assert!(!created.resolved);

    // list
    let res = request(&app, "GET", "/", None, &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await;
    assert!(page.contains("Test"));
    assert!(page.contains("First"));
    assert!(page.contains("Dec 31, 2025"));

    // edit
    let res = request(&app, "GET", &format!("/{}/edit", created.id), None, &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await;
    assert!(page.contains("Edit Task"));
    assert!(page.contains(r#"value="Test""#));
    assert!(page.contains(r#"value="2025-12-31""#));

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let res = request(&app, "POST", &format!("/{}/edit", created.id), Some("title=Updated+Title&description=&due_date=&resolved=on"), &[]).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let updated = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(updated.title, "Updated Title");
    assert_eq!(updated.due_date, None);
    assert!(updated.resolved);
    assert_eq!(all(&repo).await.len(), 1);

    // toggle
    let res = request(&app, "POST", &format!("/{}/toggle", created.id), None, &[]).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(!repo.get(created.id).await.unwrap().unwrap().resolved);

    // delete
    let res = request(&app, "GET", &format!("/{}/delete", created.id), None, &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await;
    assert!(page.contains("Delete Task"));
    assert!(page.contains("Updated Title"));
    assert!(page.contains("Are you sure"));

    let res = request(&app, "POST", &format!("/{}/delete", created.id), None, &[]).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
    assert!(all(&repo).await.is_empty());

    // gone
    for (method, path) in [("GET", "edit"), ("GET", "delete"), ("POST", "delete"), ("POST", "toggle")] {
        let res = request(&app, method, &format!("/{}/{}", created.id, path), None, &[]).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{method} {path}");
    }
}

#[tokio::test]
async fn empty_list_shows_empty_state() {
    let (app, _repo) = setup().await;
    let res = request(&app, "GET", "/", None, &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body(res).await.contains("No tasks yet"));
}

#[tokio::test]
async fn filters_and_counts() {
    let (app, repo) = setup().await;
    request(&app, "POST", "/new", Some("title=Active+Task"), &[]).await;
    request(&app, "POST", "/new", Some("title=Other+Active"), &[]).await;
    request(&app, "POST", "/new", Some("title=Done+Task&resolved=on"), &[]).await;
    assert_eq!(repo.counts().await.unwrap().done, 1);

    let page = body(request(&app, "GET", "/?filter=active", None, &[]).await).await;
    assert!(page.contains("Active Task"));
    assert!(!page.contains("Done Task"));
    assert!(page.contains("All (3)") && page.contains("Active (2)") && page.contains("Done (1)"));

    for path in ["/?filter=done", "/?filter=resolved"] {
        let page = body(request(&app, "GET", path, None, &[]).await).await;
        assert!(!page.contains("Active Task"), "{path}");
        assert!(page.contains("Done Task"), "{path}");
    }

    let page = body(request(&app, "GET", "/?filter=whatever", None, &[]).await).await;
    assert!(page.contains("Active Task") && page.contains("Done Task"));
}

#[tokio::test]
async fn filtered_view_with_no_matches() {
    let (app, _repo) = setup().await;
    request(&app, "POST", "/new", Some("title=Open"), &[]).await;
    let page = body(request(&app, "GET", "/?filter=done", None, &[]).await).await;
    assert!(page.contains("No tasks match this filter"));
    assert!(!page.contains("No tasks yet"));
}

#[tokio::test]
async fn create_form_and_invalid_submit() {
    let (app, repo) = setup().await;

    let res = request(&app, "GET", "/new", None, &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body(res).await.contains("Create New Task"));

    let res = request(&app, "POST", "/new", Some("title=+++&description=Keep+me&due_date=someday"), &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await;
    assert!(page.contains("This field is required."));
    assert!(page.contains("Enter a valid date."));
    assert!(page.contains("Keep me"));
    assert!(page.contains(r#"value="someday""#));
    assert!(all(&repo).await.is_empty());
}

#[tokio::test]
async fn invalid_edit_keeps_record() {
    let (app, repo) = setup().await;
    request(&app, "POST", "/new", Some("title=Original"), &[]).await;
    let todo = all(&repo).await.pop().unwrap();

    let res = request(&app, "POST", &format!("/{}/edit", todo.id), Some("title="), &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page = body(res).await;
    assert!(page.contains("This field is required."));
    assert!(page.contains("Edit Task"));
    assert_eq!(repo.get(todo.id).await.unwrap().unwrap(), todo);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let (app, _repo) = setup().await;
    let missing = uuid::Uuid::new_v4();
    for path in [format!("/{missing}/edit"), format!("/{missing}/delete"), "/not-a-uuid/edit".to_string()] {
        let res = request(&app, "GET", &path, None, &[]).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
        assert!(body(res).await.contains("Not found"));
    }
    let res = request(&app, "POST", &format!("/{missing}/edit"), Some("title=x"), &[]).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn toggle_redirects_to_next_then_referer_then_list() {
    let (app, repo) = setup().await;
    request(&app, "POST", "/new", Some("title=Toggle+Test"), &[]).await;
    let todo = all(&repo).await.pop().unwrap();
    let url = format!("/{}/toggle", todo.id);

    let res = request(&app, "POST", &url, Some("next=%2F%3Ffilter%3Dactive"), &[]).await;
    assert_eq!(location(&res), "/?filter=active");
    assert!(repo.get(todo.id).await.unwrap().unwrap().resolved);

    let res = request(&app, "POST", &format!("{url}?next=/?filter=done"), None, &[]).await;
    assert_eq!(location(&res), "/?filter=done");
    assert!(!repo.get(todo.id).await.unwrap().unwrap().resolved);

    let res = request(&app, "POST", &url, None, &[("referer", "http://localhost:3000/?filter=done")]).await;
    assert_eq!(location(&res), "/?filter=done");

    let res = request(&app, "POST", &url, Some("next=https%3A%2F%2Fevil.example%2F"), &[]).await;
    assert_eq!(location(&res), "/");
    assert!(!repo.get(todo.id).await.unwrap().unwrap().resolved);
}

#[tokio::test]
async fn only_open_items_are_flagged_overdue_or_due_today() {
    let (app, _repo) = setup().await;
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    request(&app, "POST", "/new", Some("title=Late+and+open&due_date=2000-01-01"), &[]).await;
    request(&app, "POST", "/new", Some("title=Late+but+done&due_date=2000-01-01&resolved=on"), &[]).await;
    request(&app, "POST", "/new", Some(&format!("title=Due+now&due_date={today}")), &[]).await;
    request(&app, "POST", "/new", Some(&format!("title=Done+now&due_date={today}&resolved=on")), &[]).await;

    let page = body(request(&app, "GET", "/", None, &[]).await).await;
    assert!(page.contains("Late but done"));
    assert_eq!(page.matches("(overdue)").count(), 1);
    assert_eq!(page.matches("(today)").count(), 1);

    let done = body(request(&app, "GET", "/?filter=done", None, &[]).await).await;
    assert!(!done.contains("(overdue)") && !done.contains("(today)"));
}

#[tokio::test]
async fn corrupt_row_renders_error_page() {
    let (app, repo) = setup().await;
    sqlx::query("INSERT INTO todos (id, title, created_at, updated_at) VALUES (?1, 'Broken', 'garbage', 'garbage')")
        .bind(uuid::Uuid::new_v4().to_string())
        .execute(repo.pool())
        .await
        .unwrap();

    let res = request(&app, "GET", "/", None, &[]).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body(res).await.contains("Something went wrong"));
}

#[tokio::test]
async fn undecodable_forms_render_bad_request_page() {
    let (app, repo) = setup().await;
    let res = request(&app, "POST", "/new", Some("title=a&title=b"), &[]).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body(res).await;
    assert!(page.contains("Bad request"));
    assert!(page.contains("duplicate field"));
    assert!(all(&repo).await.is_empty());

    request(&app, "POST", "/new", Some("title=Keep"), &[]).await;
    let todo = all(&repo).await.pop().unwrap();
    let res = request(&app, "POST", &format!("/{}/edit", todo.id), Some("title=a&title=b"), &[]).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body(res).await.contains("Bad request"));

    let res = request(&app, "POST", &format!("/{}/edit", todo.id), None, &[]).await;
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body(res).await.contains("Bad request"));
    assert_eq!(repo.get(todo.id).await.unwrap().unwrap(), todo);
}

#[tokio::test]
async fn health() {
    let (app, _repo) = setup().await;
    let res = request(&app, "GET", "/health", None, &[]).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await, "ok");
}

async fn request(app: &Router, method: &str, path: &str, form: Option<&str>, headers: &[(&str, &str)]) -> hyper::Response<axum::body::Body> {
    use axum::body::Body;
    use axum::http::{Request, Method};
    use tower::ServiceExt;

    let mut req = Request::builder().method(Method::from_bytes(method.as_bytes()).unwrap()).uri(path);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    let req = match form {
        Some(form) => req.header("content-type", "application/x-www-form-urlencoded").body(Body::from(form.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
}

async fn body(res: hyper::Response<axum::body::Body>) -> String {
    String::from_utf8(to_bytes(res.into_body(), 1024 * 1024).await.unwrap().to_vec()).unwrap()
}

fn location(res: &hyper::Response<axum::body::Body>) -> &str {
    res.headers().get("location").unwrap().to_str().unwrap()
}
