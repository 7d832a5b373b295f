use super::{errors::AuthError, types::Identity, types::Role};

/// Single authorization check used by every privileged route.
pub fn authorize(identity: &Identity, required: Role) -> Result<(), AuthError> {
    if identity.role.grants(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole { required })
    }
}
