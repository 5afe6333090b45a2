use crate::{
    Result,
    app::App,
    info,
    router::{Route, View},
};

pub fn route(app: &App, path: &str) -> Result<()> {
    let router = app.router();
    match router.resolve(path) {
        View::Loading => info!("{} -> loading", path),
        View::Page(Route::NotFound) => info!("{} -> not found", path),
        View::Page(route) => info!("{} -> {}", path, route.title()),
        View::Redirect(to) => info!("{} -> redirect {}", path, to),
    }
    Ok(())
}
