use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

/// Every distinct failure condition the API can report. Each variant maps to
/// exactly one HTTP status and one catalog message, so handlers and services
/// never carry message strings themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // autenticación
    AuthInvalidCredentials,
    AuthEmailAlreadyRegistered,
    AuthUnauthenticated,
    // grupos
    GroupNotFound,
    GroupNotMember,
    GroupOnlyOwnerCanInvite,
    GroupOnlyOwnerCanDelete,
    GroupOnlyOwnerCanUpdateRules,
    GroupNameTooShort,
    // invitaciones
    InvitationNotFound,
    InvitationNotYours,
    // eventos
    EventNotFound,
    EventNotMember,
    EventOnlyCreatorOrOwnerCanDelete,
    EventTitleRequired,
    EventDateRequired,
    EventTypeInvalid,
    // gastos
    ExpenseNotFound,
    ExpenseNotMember,
    ExpenseOnlyPayerOrOwnerCanDelete,
    ExpenseDescriptionRequired,
    ExpenseAmountInvalid,
    // perfil
    ProfileUserNotFound,
    ProfileNameTooShort,
    // validación
    ValidationEmailInvalid,
    ValidationPasswordTooShort,
    ValidationNameTooShort,
    ValidationFieldRequired,
    ValidationDateInvalid,
    ValidationUserIdInvalid,
    // servidor
    ServerInternalError,
    ServerMigrationsMissing,
}

impl ErrorKind {
    /// Mensajes descriptivos en español, uno por condición.
    pub fn message(self) -> &'static str {
        match self {
            Self::AuthInvalidCredentials => {
                "Credenciales inválidas. Verifica tu correo electrónico y contraseña."
            }
            Self::AuthEmailAlreadyRegistered => {
                "Este correo electrónico ya está registrado. Por favor, inicia sesión o usa otro correo."
            }
            Self::AuthUnauthenticated => "No estás autenticado. Por favor, inicia sesión.",
            Self::GroupNotFound => "El grupo no existe o ha sido eliminado.",
            Self::GroupNotMember => {
                "No eres miembro de este grupo. Debes ser invitado para acceder."
            }
            Self::GroupOnlyOwnerCanInvite => {
                "Solo el propietario del grupo puede enviar invitaciones."
            }
            Self::GroupOnlyOwnerCanDelete => "Solo el propietario del grupo puede eliminarlo.",
            Self::GroupOnlyOwnerCanUpdateRules => {
                "Solo el propietario del grupo puede actualizar las reglas."
            }
            Self::GroupNameTooShort => "El nombre del grupo debe tener al menos 2 caracteres.",
            Self::InvitationNotFound => "La invitación no existe o ya ha sido procesada.",
            Self::InvitationNotYours => "Esta invitación no es para tu correo electrónico.",
            Self::EventNotFound => "El evento no existe o ha sido eliminado.",
            Self::EventNotMember => {
                "No puedes acceder a este evento porque no eres miembro del grupo."
            }
            Self::EventOnlyCreatorOrOwnerCanDelete => {
                "Solo el creador del evento o el propietario del grupo pueden eliminarlo."
            }
            Self::EventTitleRequired => "El título del evento es obligatorio.",
            Self::EventDateRequired => "La fecha del evento es obligatoria.",
            Self::EventTypeInvalid => {
                "El tipo de evento no es válido. Debe ser: TASK, EVENT o REMINDER."
            }
            Self::ExpenseNotFound => "El gasto no existe o ha sido eliminado.",
            Self::ExpenseNotMember => {
                "No puedes acceder a este gasto porque no eres miembro del grupo."
            }
            Self::ExpenseOnlyPayerOrOwnerCanDelete => {
                "Solo quien pagó el gasto o el propietario del grupo pueden eliminarlo."
            }
            Self::ExpenseDescriptionRequired => "La descripción del gasto es obligatoria.",
            Self::ExpenseAmountInvalid => "El importe debe ser un número mayor a 0.",
            Self::ProfileUserNotFound => {
                "No se pudo encontrar tu perfil. Por favor, recarga la página."
            }
            Self::ProfileNameTooShort => "El nombre debe tener al menos 2 caracteres.",
            Self::ValidationEmailInvalid => "El correo electrónico no es válido.",
            Self::ValidationPasswordTooShort => "La contraseña debe tener al menos 6 caracteres.",
            Self::ValidationNameTooShort => "El nombre debe tener al menos 2 caracteres.",
            Self::ValidationFieldRequired => "Este campo es obligatorio.",
            Self::ValidationDateInvalid => "La fecha no es válida.",
            Self::ValidationUserIdInvalid => "El identificador de usuario no es válido.",
            Self::ServerInternalError => {
                "Error interno del servidor. Por favor, intenta nuevamente más tarde."
            }
            Self::ServerMigrationsMissing => {
                "Las tablas de la base de datos no existen. Ejecuta las migraciones con sqlx migrate run."
            }
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::GroupNameTooShort
            | Self::EventTitleRequired
            | Self::EventDateRequired
            | Self::EventTypeInvalid
            | Self::ExpenseDescriptionRequired
            | Self::ExpenseAmountInvalid
            | Self::ProfileNameTooShort
            | Self::ValidationEmailInvalid
            | Self::ValidationPasswordTooShort
            | Self::ValidationNameTooShort
            | Self::ValidationFieldRequired
            | Self::ValidationDateInvalid
            | Self::ValidationUserIdInvalid => StatusCode::BAD_REQUEST,

            Self::AuthInvalidCredentials | Self::AuthUnauthenticated => StatusCode::UNAUTHORIZED,

            Self::GroupNotMember
            | Self::GroupOnlyOwnerCanInvite
            | Self::GroupOnlyOwnerCanDelete
            | Self::GroupOnlyOwnerCanUpdateRules
            | Self::InvitationNotYours
            | Self::EventNotMember
            | Self::EventOnlyCreatorOrOwnerCanDelete
            | Self::ExpenseNotMember
            | Self::ExpenseOnlyPayerOrOwnerCanDelete => StatusCode::FORBIDDEN,

            Self::GroupNotFound
            | Self::InvitationNotFound
            | Self::EventNotFound
            | Self::ExpenseNotFound
            | Self::ProfileUserNotFound => StatusCode::NOT_FOUND,

            Self::AuthEmailAlreadyRegistered => StatusCode::CONFLICT,

            Self::ServerInternalError | Self::ServerMigrationsMissing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
}

impl AppError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<ErrorKind> for AppError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // 42P01 = undefined_table: surface an actionable operator message
        // instead of a generic 500.
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("42P01") {
                tracing::error!("Missing table: {}", db_err);
                return Self::new(ErrorKind::ServerMigrationsMissing);
            }
        }
        tracing::error!("Database error: {}", err);
        Self::new(ErrorKind::ServerInternalError)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub error: String,
    pub timestamp: String,
    pub path: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        let body = ErrorBody {
            status_code: status.as_u16(),
            message: self.kind.message().to_string(),
            error: status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string(),
            timestamp: Utc::now().to_rfc3339(),
            // filled in by the error_context middleware, which knows the URI
            path: String::new(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            ErrorKind::GroupNameTooShort.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorKind::AuthInvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorKind::GroupNotMember.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::GroupNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorKind::AuthEmailAlreadyRegistered.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorKind::ServerMigrationsMissing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn distinct_conditions_have_distinct_messages() {
        // "not a member" and "not the owner" share a status but must stay
        // distinguishable to the client.
        assert_ne!(
            ErrorKind::GroupNotMember.message(),
            ErrorKind::GroupOnlyOwnerCanDelete.message()
        );
        assert_ne!(
            ErrorKind::EventOnlyCreatorOrOwnerCanDelete.message(),
            ErrorKind::ExpenseOnlyPayerOrOwnerCanDelete.message()
        );
    }
}
