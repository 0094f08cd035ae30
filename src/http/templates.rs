use std::sync::LazyLock;

use minijinja::Environment;
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("todo_list.html", include_str!("../../templates/todo_list.html")),
    ("todo_form.html", include_str!("../../templates/todo_form.html")),
    ("todo_confirm_delete.html", include_str!("../../templates/todo_confirm_delete.html")),
    ("400.html", include_str!("../../templates/400.html")),
    ("404.html", include_str!("../../templates/404.html")),
    ("500.html", include_str!("../../templates/500.html")),
];

static ENVIRONMENT: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    for &(name, source) in TEMPLATES {
        if let Err(err) = env.add_template(name, source) {
            tracing::error!(template = name, %err, "template failed to compile");
        }
    }
    env
});

/// Renders a compiled-in template; `.html` names are auto-escaped.
pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<String, minijinja::Error> {
    ENVIRONMENT.get_template(name)?.render(ctx)
}
