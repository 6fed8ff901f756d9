use askama::Template;
use axum::response::Html;
use goodtables_core::AppError;

/// Page shell the front-end bundle mounts `component` into.
#[derive(Template)]
#[template(path = "index.html")]
struct ComponentPage<'a> {
    component: &'a str,
    props: String,
}

/// Renders the named front-end component with `props` as its initial data.
pub fn render_component(component: &str, props: serde_json::Value) -> Result<Html<String>, AppError> {
    ComponentPage {
        component,
        props: props.to_string(),
    }
    .render()
    .map(Html)
    .map_err(|err| AppError::internal(format!("cannot render component `{component}`: {err}")))
}
