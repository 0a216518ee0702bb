use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    auth::{AuthenticatedUser, CurrentUser},
    constants::MAX_USERNAME_LENGTH,
    error::{AppError, OptionExt},
    models::{PublicUser, User, WatchArea},
    notify::locale::Locale,
    policy::{self, Visibility},
    read_tracking,
    repositories::{
        user_repository::{self, CreateUserData},
        watch_area_repository,
    },
    AppState,
};

fn validate_username(username: &str) -> Result<String, AppError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AppError::bad_request(format!(
            "Username must be 1 to {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '@' | '+'))
    {
        return Err(AppError::bad_request(
            "Username may only contain letters, digits and @.+-_",
        ));
    }
    Ok(username.to_string())
}

/// Empty means "use the site default". Stored normalized (`ru-RU` becomes `ru`).
fn validate_language(language: Option<&str>) -> Result<Option<String>, AppError> {
    match language.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => Locale::from_code(code)
            .map(|locale| Some(locale.code().to_string()))
            .ok_or_else(|| AppError::bad_request(format!("Unsupported language: {}", code))),
    }
}

fn validate_email(state: &AppState, email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if !email.is_empty() && !state.notifier.accepts_address(email) {
        return Err(AppError::bad_request("Invalid email address"));
    }
    Ok(email.to_string())
}

/// Registers a forum account for the verified key.
pub async fn register_user_handler(
    State(state): State<AppState>,
    key: AuthenticatedUser,
    Json(payload): Json<CreateUserData>,
) -> Result<Response, AppError> {
    let data = CreateUserData {
        username: validate_username(&payload.username)?,
        email: validate_email(&state, &payload.email)?,
        language: validate_language(payload.language.as_deref())?,
    };

    if user_repository::get_user_by_public_key(&state.db_pool, &key.0).await?.is_some() {
        return Err(AppError::Conflict("This key is already registered".to_string()));
    }

    match user_repository::create_user(&state.db_pool, &key.0, &data).await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "Registered user");
            Ok((StatusCode::CREATED, Json(user)).into_response())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            warn!(username = %data.username, "Registration with a taken username or key");
            Err(AppError::Conflict("Username is already taken".to_string()))
        }
        Err(e) => {
            error!(error = %e, "Failed to register user");
            Err(AppError::Database(e))
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub topic_count: i64,
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let user = user_repository::get_user_by_username(&state.db_pool, &username)
        .await?
        .or_not_found()?;
    let topic_count = user_repository::count_topics_by_user(&state.db_pool, user.id).await?;
    Ok(Json(UserProfileResponse {
        user: PublicUser::from(&user),
        topic_count,
    }))
}

pub async fn block_user_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    if !policy::is_superuser(Some(&user)) {
        warn!(user_id = %user.id, target = %username, "Block denied");
        return Err(AppError::Forbidden);
    }
    let target = user_repository::get_user_by_username(&state.db_pool, &username)
        .await?
        .or_not_found()?;
    user_repository::set_active(&state.db_pool, target.id, false).await?;
    info!(user_id = %target.id, blocked_by = %user.id, "Blocked user");
    Ok(Redirect::to(&format!("/users/{}", target.username)))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfileResponse {
    pub user: User,
    pub own_watch_areas: Vec<WatchArea>,
    pub watched_areas: Vec<WatchArea>,
}

async fn profile(state: &AppState, user: User) -> Result<ProfileResponse, AppError> {
    let own_watch_areas = watch_area_repository::list_owned_watch_areas(&state.db_pool, user.id).await?;
    let watched_areas = watch_area_repository::list_watched_areas(&state.db_pool, user.id).await?;
    Ok(ProfileResponse {
        user,
        own_watch_areas,
        watched_areas,
    })
}

pub async fn get_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(profile(&state, user).await?))
}

#[derive(Deserialize, Debug)]
pub struct EditProfileRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub language: Option<String>,
}

pub async fn edit_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<EditProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let email = validate_email(&state, &payload.email)?;
    let language = validate_language(payload.language.as_deref())?;

    let updated = user_repository::update_profile(&state.db_pool, user.id, &email, language.as_deref())
        .await?
        .or_not_found()?;
    info!(user_id = %user.id, "Updated profile");

    // Keep the admin elevation computed at authentication time.
    let updated = User {
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        ..updated
    };
    Ok(Json(profile(&state, updated).await?))
}

pub async fn mark_all_as_read_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Redirect, AppError> {
    let visibility = Visibility::for_viewer(Some(&user));
    let forums = read_tracking::mark_all_as_read(&state.db_pool, user.id, &visibility).await?;
    info!(user_id = %user.id, forums, "Marked all forums as read");
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert_eq!(validate_username(" erin ").unwrap(), "erin");
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
        assert!(validate_username("ivan.petrov@home").is_ok());
    }

    #[test]
    fn languages_are_normalized() {
        assert_eq!(validate_language(None).unwrap(), None);
        assert_eq!(validate_language(Some("  ")).unwrap(), None);
        assert_eq!(validate_language(Some("ru-RU")).unwrap(), Some("ru".to_string()));
        assert!(validate_language(Some("klingon")).is_err());
    }
}
