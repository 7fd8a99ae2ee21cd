use askama::Template;
use axum::{
    Extension, Form,
    extract::Path,
    response::{Html, IntoResponse, Redirect, Response},
};
use http::StatusCode;
use serde::Deserialize;

use snipbox::{Snippet, SnippetStore, UserError, UserStore, Validator};

use crate::error::IntoResponseError;
use crate::session::{AuthState, Session};

/// Liveness probe, outside every chain.
pub(crate) async fn ping() -> &'static str {
    "OK"
}

pub(crate) async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn render<T: Template>(template: &T) -> Result<Html<String>, (StatusCode, String)> {
    Ok(Html(template.render().into_response_error()?))
}

#[derive(Template)]
#[template(path = "home.j2")]
struct HomeTemplate {
    flash: Option<String>,
    is_authenticated: bool,
    csrf_token: String,
    snippets: Vec<Snippet>,
}

pub(crate) async fn home(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, (StatusCode, String)> {
    let snippets = SnippetStore::latest().await.into_response_error()?;

    let template = HomeTemplate {
        flash: session.take_flash(),
        is_authenticated: auth.is_authenticated(),
        csrf_token: session.csrf_token(),
        snippets,
    };
    Ok(render(&template)?.into_response())
}

#[derive(Template)]
#[template(path = "view.j2")]
struct ViewTemplate {
    flash: Option<String>,
    is_authenticated: bool,
    csrf_token: String,
    snippet: Snippet,
}

pub(crate) async fn snippet_view(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    // A non-numeric or non-positive id is indistinguishable from an unknown
    // snippet to the client
    let Ok(id) = id.parse::<i64>() else {
        return Ok(not_found().await);
    };
    if id < 1 {
        return Ok(not_found().await);
    }

    let Some(snippet) = SnippetStore::get(id).await.into_response_error()? else {
        return Ok(not_found().await);
    };

    let template = ViewTemplate {
        flash: session.take_flash(),
        is_authenticated: auth.is_authenticated(),
        csrf_token: session.csrf_token(),
        snippet,
    };
    Ok(render(&template)?.into_response())
}

#[derive(Deserialize)]
pub(crate) struct SnippetCreateForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    expires: String,
}

#[derive(Template)]
#[template(path = "create.j2")]
struct CreateTemplate {
    flash: Option<String>,
    is_authenticated: bool,
    csrf_token: String,
    title: String,
    content: String,
    expires: String,
    title_error: Option<String>,
    content_error: Option<String>,
    expires_error: Option<String>,
}

impl CreateTemplate {
    fn from_form(
        session: &Session,
        auth: AuthState,
        form: &SnippetCreateForm,
        v: &Validator,
    ) -> Self {
        Self {
            flash: session.take_flash(),
            is_authenticated: auth.is_authenticated(),
            csrf_token: session.csrf_token(),
            title: form.title.clone(),
            content: form.content.clone(),
            expires: form.expires.clone(),
            title_error: v.field_error("title").map(str::to_string),
            content_error: v.field_error("content").map(str::to_string),
            expires_error: v.field_error("expires").map(str::to_string),
        }
    }
}

pub(crate) async fn snippet_create_form(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, (StatusCode, String)> {
    let form = SnippetCreateForm {
        title: String::new(),
        content: String::new(),
        expires: "365".to_string(),
    };
    let template = CreateTemplate::from_form(&session, auth, &form, &Validator::new());
    Ok(render(&template)?.into_response())
}

pub(crate) async fn snippet_create(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
    Form(form): Form<SnippetCreateForm>,
) -> Result<Response, (StatusCode, String)> {
    let mut v = Validator::new();
    v.check_field("title", &form.title)
        .not_blank("This field cannot be blank")
        .max_chars(100, "This field cannot be more than 100 characters long");
    v.check_field("content", &form.content)
        .not_blank("This field cannot be blank");
    let expires = v
        .check_field("expires", &form.expires)
        .one_of(&["1", "7", "30", "365"], "This field must equal 1, 7, 30 or 365")
        .to_int("This field must be a number");

    if !v.is_valid() {
        let template = CreateTemplate::from_form(&session, auth, &form, &v);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?).into_response());
    }

    let id = SnippetStore::insert(&form.title, &form.content, expires)
        .await
        .into_response_error()?;

    session.put_flash("Snippet successfully created!");
    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}

#[derive(Deserialize)]
pub(crate) struct SignupForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Template)]
#[template(path = "signup.j2")]
struct SignupTemplate {
    flash: Option<String>,
    is_authenticated: bool,
    csrf_token: String,
    name: String,
    email: String,
    name_error: Option<String>,
    email_error: Option<String>,
    password_error: Option<String>,
}

impl SignupTemplate {
    fn from_form(session: &Session, auth: AuthState, form: &SignupForm, v: &Validator) -> Self {
        Self {
            flash: session.take_flash(),
            is_authenticated: auth.is_authenticated(),
            csrf_token: session.csrf_token(),
            name: form.name.clone(),
            email: form.email.clone(),
            name_error: v.field_error("name").map(str::to_string),
            email_error: v.field_error("email").map(str::to_string),
            password_error: v.field_error("password").map(str::to_string),
        }
    }
}

pub(crate) async fn user_signup_form(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, (StatusCode, String)> {
    let form = SignupForm {
        name: String::new(),
        email: String::new(),
        password: String::new(),
    };
    let template = SignupTemplate::from_form(&session, auth, &form, &Validator::new());
    Ok(render(&template)?.into_response())
}

pub(crate) async fn user_signup(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, (StatusCode, String)> {
    let mut v = Validator::new();
    v.check_field("name", &form.name)
        .not_blank("This field cannot be blank");
    v.check_field("email", &form.email)
        .not_blank("This field cannot be blank")
        .is_email("This field must be a valid email address");
    v.check_field("password", &form.password)
        .not_blank("This field cannot be blank")
        .min_chars(8, "This field must be at least 8 characters long");

    if v.is_valid() {
        match UserStore::create_user(&form.name, &form.email, &form.password).await {
            Ok(_) => {
                session.put_flash("Your signup was successful. Please log in.");
                return Ok(Redirect::to("/user/login").into_response());
            }
            Err(UserError::DuplicateEmail) => {
                v.add_field_error("email", "Email address is already in use");
            }
            Err(e) => return Err(e).into_response_error(),
        }
    }

    let template = SignupTemplate::from_form(&session, auth, &form, &v);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?).into_response())
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Template)]
#[template(path = "login.j2")]
struct LoginTemplate {
    flash: Option<String>,
    is_authenticated: bool,
    csrf_token: String,
    email: String,
    email_error: Option<String>,
    password_error: Option<String>,
    non_field_errors: Vec<String>,
}

impl LoginTemplate {
    fn from_form(session: &Session, auth: AuthState, form: &LoginForm, v: &Validator) -> Self {
        Self {
            flash: session.take_flash(),
            is_authenticated: auth.is_authenticated(),
            csrf_token: session.csrf_token(),
            email: form.email.clone(),
            email_error: v.field_error("email").map(str::to_string),
            password_error: v.field_error("password").map(str::to_string),
            non_field_errors: v.non_field_errors().to_vec(),
        }
    }
}

pub(crate) async fn user_login_form(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, (StatusCode, String)> {
    let form = LoginForm {
        email: String::new(),
        password: String::new(),
    };
    let template = LoginTemplate::from_form(&session, auth, &form, &Validator::new());
    Ok(render(&template)?.into_response())
}

pub(crate) async fn user_login(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let mut v = Validator::new();
    v.check_field("email", &form.email)
        .not_blank("This field cannot be blank")
        .is_email("This field must be a valid email address");
    v.check_field("password", &form.password)
        .not_blank("This field cannot be blank");

    if v.is_valid() {
        match UserStore::authenticate(&form.email, &form.password).await {
            Ok(user_id) => {
                // Token renewal on privilege change; the commit in the
                // session layer issues the new cookie
                session.log_in(user_id).into_response_error()?;
                let target = session
                    .take_redirect_to()
                    .unwrap_or_else(|| "/".to_string());
                return Ok(Redirect::to(&target).into_response());
            }
            Err(UserError::InvalidCredentials) => {
                v.add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e).into_response_error(),
        }
    }

    let template = LoginTemplate::from_form(&session, auth, &form, &v);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?).into_response())
}

pub(crate) async fn user_logout(
    Extension(session): Extension<Session>,
) -> Result<Response, (StatusCode, String)> {
    session.log_out().into_response_error()?;
    session.put_flash("You've been logged out successfully!");
    Ok(Redirect::to("/").into_response())
}

#[derive(Deserialize)]
pub(crate) struct PasswordUpdateForm {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

#[derive(Template)]
#[template(path = "password.j2")]
struct PasswordTemplate {
    flash: Option<String>,
    is_authenticated: bool,
    csrf_token: String,
    current_password_error: Option<String>,
    new_password_error: Option<String>,
    confirm_password_error: Option<String>,
}

impl PasswordTemplate {
    fn from_validator(session: &Session, auth: AuthState, v: &Validator) -> Self {
        Self {
            flash: session.take_flash(),
            is_authenticated: auth.is_authenticated(),
            csrf_token: session.csrf_token(),
            current_password_error: v.field_error("current_password").map(str::to_string),
            new_password_error: v.field_error("new_password").map(str::to_string),
            confirm_password_error: v.field_error("confirm_password").map(str::to_string),
        }
    }
}

pub(crate) async fn password_update_form(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
) -> Result<Response, (StatusCode, String)> {
    let template = PasswordTemplate::from_validator(&session, auth, &Validator::new());
    Ok(render(&template)?.into_response())
}

pub(crate) async fn password_update(
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
    Form(form): Form<PasswordUpdateForm>,
) -> Result<Response, (StatusCode, String)> {
    let Some(user_id) = auth.user_id() else {
        // Unreachable behind require_authentication
        tracing::error!("password_update reached without an authenticated user");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        ));
    };

    let mut v = Validator::new();
    v.check_field("current_password", &form.current_password)
        .not_blank("This field cannot be blank");
    v.check_field("new_password", &form.new_password)
        .not_blank("This field cannot be blank")
        .min_chars(8, "This field must be at least 8 characters long");
    v.check_field("confirm_password", &form.confirm_password)
        .not_blank("This field cannot be blank")
        .equals(&form.new_password, "Passwords do not match");

    if v.is_valid() {
        match UserStore::update_password(user_id, &form.current_password, &form.new_password).await
        {
            Ok(()) => {
                session.renew().into_response_error()?;
                session.put_flash("Your password has been updated!");
                return Ok(Redirect::to("/").into_response());
            }
            Err(UserError::InvalidCredentials) => {
                v.add_field_error("current_password", "Current password is incorrect");
            }
            Err(e) => return Err(e).into_response_error(),
        }
    }

    let template = PasswordTemplate::from_validator(&session, auth, &v);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)?).into_response())
}
