//! User-management route handlers (staff CRUD over users + profiles).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use clover_core::UserId;

use crate::db::{CustomerRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CsrfToken;
use crate::models::{Customer, User};
use crate::routes::categories::MessageQuery;
use crate::routes::redirect_with;
use crate::services::auth::{AuthError, AuthService};
use crate::services::checkout::ShippingForm;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// User display data for templates.
#[derive(Clone)]
pub struct UserRowView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
}

impl From<&User> for UserRowView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i64(),
            username: user.username.clone(),
            email: user.email.to_string(),
            display_name: user.display_name(),
        }
    }
}

/// Customer profile display data for the user detail page.
#[derive(Clone, Default)]
pub struct ProfileView {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&Customer> for ProfileView {
    fn from(customer: &Customer) -> Self {
        Self {
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            city: customer.city.clone(),
            state: customer.state.clone(),
            postal_code: customer.postal_code.clone(),
            country: customer.country.clone(),
        }
    }
}

/// Raw form values echoed back into the user form.
#[derive(Clone, Default)]
pub struct UserFormValues {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Form Types
// =============================================================================

/// User create form data: account fields, password, and profile fields.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCreateForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub csrf_token: String,
}

/// User update form data: like create, but without a password.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdateForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub csrf_token: String,
}

/// Delete form data: just the anti-forgery token.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteForm {
    pub csrf_token: String,
}

// =============================================================================
// Templates
// =============================================================================

/// User list page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/list.html")]
pub struct UserListTemplate {
    pub users: Vec<UserRowView>,
    pub csrf_token: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// User detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/detail.html")]
pub struct UserDetailTemplate {
    pub user: UserRowView,
    pub has_profile: bool,
    pub profile: ProfileView,
    pub success: Option<String>,
}

/// User create/update form template.
#[derive(Template, WebTemplate)]
#[template(path = "users/form.html")]
pub struct UserFormTemplate {
    pub title: String,
    pub action: String,
    /// Whether to render the password field (create only).
    pub with_password: bool,
    pub values: UserFormValues,
    pub csrf_token: String,
    pub error: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display all users.
#[instrument(skip(state, csrf))]
pub async fn list(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool()).list().await?;

    Ok(UserListTemplate {
        users: users.iter().map(UserRowView::from).collect(),
        csrf_token: csrf,
        error: query.error,
        success: query.success,
    })
}

/// Display a user and their customer profile, if any.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    let customer = CustomerRepository::new(state.pool())
        .get_by_user(user.id)
        .await?;

    Ok(UserDetailTemplate {
        user: UserRowView::from(&user),
        has_profile: customer.is_some(),
        profile: customer.as_ref().map(ProfileView::from).unwrap_or_default(),
        success: query.success,
    })
}

/// Display the empty user creation form.
#[instrument(skip(csrf))]
pub async fn create_form(CsrfToken(csrf): CsrfToken) -> impl IntoResponse {
    UserFormTemplate {
        title: "Create User".to_owned(),
        action: "/user/create/".to_owned(),
        with_password: true,
        values: UserFormValues::default(),
        csrf_token: csrf,
        error: None,
    }
}

fn profile_form(
    phone: &Option<String>,
    address: &Option<String>,
    city: &Option<String>,
    state: &Option<String>,
    postal_code: &Option<String>,
    country: &Option<String>,
) -> ShippingForm {
    ShippingForm {
        phone: phone.clone(),
        address: address.clone(),
        city: city.clone(),
        state: state.clone(),
        postal_code: postal_code.clone(),
        country: country.clone(),
    }
}

/// Handle user creation: the account plus its customer profile.
#[instrument(skip(state, csrf, form))]
pub async fn create(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Form(form): Form<UserCreateForm>,
) -> Result<Response> {
    let values = UserFormValues {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        phone: form.phone.clone().unwrap_or_default(),
        address: form.address.clone().unwrap_or_default(),
        city: form.city.clone().unwrap_or_default(),
        state: form.state.clone().unwrap_or_default(),
        postal_code: form.postal_code.clone().unwrap_or_default(),
        country: form.country.clone().unwrap_or_default(),
    };

    let created = AuthService::new(state.pool())
        .create_user(
            &form.username,
            &form.email,
            form.first_name.trim(),
            form.last_name.trim(),
            &form.password,
        )
        .await;

    let user = match created {
        Ok(user) => user,
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => {
            return Err(err.into());
        }
        Err(recoverable) => {
            return Ok(UserFormTemplate {
                title: "Create User".to_owned(),
                action: "/user/create/".to_owned(),
                with_password: true,
                values,
                csrf_token: csrf,
                error: Some(recoverable.to_string()),
            }
            .into_response());
        }
    };

    // Merge the submitted profile fields into the freshly created profile.
    let customers = CustomerRepository::new(state.pool());
    let mut customer = customers.find_or_create(user.id).await?;
    profile_form(
        &form.phone,
        &form.address,
        &form.city,
        &form.state,
        &form.postal_code,
        &form.country,
    )
    .apply_to(&mut customer);
    customers.update(&customer).await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(Redirect::to(&redirect_with(
        &format!("/user/{}/", user.id),
        "success",
        "User created",
    ))
    .into_response())
}

/// Display the user update form, pre-filled from the user and profile.
#[instrument(skip(state, csrf))]
pub async fn update_form(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    let customer = CustomerRepository::new(state.pool())
        .get_by_user(user.id)
        .await?;
    let profile = customer.as_ref().map(ProfileView::from).unwrap_or_default();

    Ok(UserFormTemplate {
        title: "Update User".to_owned(),
        action: format!("/user/{id}/update/"),
        with_password: false,
        values: UserFormValues {
            username: user.username,
            email: user.email.to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
            phone: profile.phone,
            address: profile.address,
            city: profile.city,
            state: profile.state,
            postal_code: profile.postal_code,
            country: profile.country,
        },
        csrf_token: csrf,
        error: None,
    })
}

/// Handle user update: account fields plus find-or-create profile merge.
#[instrument(skip(state, csrf, form))]
pub async fn update(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
    Form(form): Form<UserUpdateForm>,
) -> Result<Response> {
    let user_id = UserId::new(id);

    let updated = AuthService::new(state.pool())
        .update_user(
            user_id,
            &form.username,
            &form.email,
            form.first_name.trim(),
            form.last_name.trim(),
        )
        .await;

    match updated {
        Ok(()) => {}
        Err(AuthError::UserNotFound) => {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        Err(err @ (AuthError::Repository(_) | AuthError::PasswordHash)) => {
            return Err(err.into());
        }
        Err(recoverable) => {
            return Ok(UserFormTemplate {
                title: "Update User".to_owned(),
                action: format!("/user/{id}/update/"),
                with_password: false,
                values: UserFormValues {
                    username: form.username.clone(),
                    email: form.email.clone(),
                    first_name: form.first_name.clone(),
                    last_name: form.last_name.clone(),
                    phone: form.phone.clone().unwrap_or_default(),
                    address: form.address.clone().unwrap_or_default(),
                    city: form.city.clone().unwrap_or_default(),
                    state: form.state.clone().unwrap_or_default(),
                    postal_code: form.postal_code.clone().unwrap_or_default(),
                    country: form.country.clone().unwrap_or_default(),
                },
                csrf_token: csrf,
                error: Some(recoverable.to_string()),
            }
            .into_response());
        }
    }

    let customers = CustomerRepository::new(state.pool());
    let mut customer = customers.find_or_create(user_id).await?;
    profile_form(
        &form.phone,
        &form.address,
        &form.city,
        &form.state,
        &form.postal_code,
        &form.country,
    )
    .apply_to(&mut customer);
    customers.update(&customer).await?;

    Ok(Redirect::to(&redirect_with(
        &format!("/user/{id}/"),
        "success",
        "User updated",
    ))
    .into_response())
}

/// Handle user deletion. The customer profile is cascade-deleted.
#[instrument(skip(state, _form))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(_form): Form<DeleteForm>,
) -> Result<Redirect> {
    let deleted = UserRepository::new(state.pool())
        .delete(UserId::new(id))
        .await?;

    if !deleted {
        return Err(AppError::NotFound(format!("user {id}")));
    }

    Ok(Redirect::to(&redirect_with(
        "/users/",
        "success",
        "User deleted",
    )))
}
