use tracing::info;

use crate::error::AppError;
use crate::models::user::{AppUser, BaseLocation, Caller, UserRole};
use crate::state::AppState;

pub fn upsert_base_location(
    state: &AppState,
    location: BaseLocation,
) -> Result<BaseLocation, AppError> {
    if location.id.trim().is_empty() || location.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "base location id and name are required".to_string(),
        ));
    }

    state.store.transaction(|t| {
        t.upsert_base_location(location.clone());
        Ok::<_, AppError>(())
    })?;

    info!(base_location_id = %location.id, "base location saved");
    Ok(location)
}

pub fn upsert_user(state: &AppState, user: AppUser) -> Result<AppUser, AppError> {
    if user.id.trim().is_empty() || user.person_name.trim().is_empty() {
        return Err(AppError::BadRequest("user id and name are required".to_string()));
    }

    state.store.transaction(|t| {
        if t.base_location(&user.base_location_id).is_none() {
            return Err(AppError::BadRequest(format!(
                "base location {} does not exist",
                user.base_location_id
            )));
        }
        t.upsert_user(user.clone())?;
        Ok(())
    })?;

    info!(user_id = %user.id, roles = user.roles.len(), "user saved");
    Ok(user)
}

/// Head office location every bootstrapped administrator belongs to.
pub const HEAD_OFFICE_ID: &str = "HQ";

/// Creates an administrator holding every role, unless the user already exists.
pub fn bootstrap_admin(state: &AppState, user_id: &str) -> Result<(), AppError> {
    if state.store.read(|t| t.user(user_id).is_some()) {
        return Ok(());
    }

    upsert_base_location(
        state,
        BaseLocation {
            id: HEAD_OFFICE_ID.to_string(),
            name: "Head Office".to_string(),
        },
    )?;
    upsert_user(
        state,
        AppUser {
            id: user_id.to_string(),
            person_name: "Administrator".to_string(),
            mobile: String::new(),
            base_location_id: HEAD_OFFICE_ID.to_string(),
            vehicle_nbr: None,
            roles: vec![
                UserRole::WebAccess,
                UserRole::AppScanner,
                UserRole::AppTripCreator,
                UserRole::AppAdmin,
                UserRole::AppTripDriver,
            ],
            is_active: true,
        },
    )?;
    Ok(())
}

/// Builds the identity of an active user.
pub fn resolve_caller(state: &AppState, user_id: &str) -> Result<Caller, AppError> {
    state.store.read(|t| {
        let user = t
            .user(user_id)
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized(format!("unknown or inactive user {user_id}")))?;

        Ok(Caller {
            id: user.id.clone(),
            username: user.person_name.clone(),
            mobile: user.mobile.clone(),
            base_location_id: user.base_location_id.clone(),
            base_location_name: t.user_location_name(&user.id),
            roles: user.roles.clone(),
        })
    })
}
