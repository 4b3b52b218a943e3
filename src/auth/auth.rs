use rocket::form::Form;
use rocket::http::RawStr;
use rocket::response::Redirect;
use rocket_dyn_templates::{Template, context};
use tracing::{info, warn};

use crate::database::DbConn;
use crate::db;
use crate::error::AppError;

pub const LOGIN_ERROR_MESSAGE: &str = "خطأ في تسجيل الدخول";

#[derive(Responder)]
pub enum LoginOutcome {
    Dashboard(Redirect),
    Retry(Template),
}

#[derive(FromForm)]
pub struct LoginForm {
    username: String,
    password: String,
}

fn render_login(username: &str, error: Option<&str>) -> Template {
    Template::render(
        "login",
        context! {
            title: "تسجيل الدخول",
            username: username,
            error: error,
        },
    )
}

#[get("/")]
pub fn login() -> Template {
    render_login("", None)
}

/// Checks the credentials and sends the user to the dashboard with their
/// role, or re-renders the login view with an error.
#[post("/", data = "<form>")]
pub async fn process_login(
    mut conn: DbConn,
    form: Form<LoginForm>,
) -> Result<LoginOutcome, AppError> {
    info!(username = %form.username, "Login attempt");

    match db::authenticate_user(&mut conn, &form.username, &form.password).await? {
        Some(user) => {
            info!(username = %user.username, role = %user.role, "Login successful");
            Ok(LoginOutcome::Dashboard(Redirect::to(format!(
                "/dashboard?role={}",
                RawStr::new(&user.role).percent_encode()
            ))))
        }
        None => {
            warn!(username = %form.username, "Login failed");
            Ok(LoginOutcome::Retry(render_login(
                &form.username,
                Some(LOGIN_ERROR_MESSAGE),
            )))
        }
    }
}
