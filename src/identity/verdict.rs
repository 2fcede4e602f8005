//! Outcome model for authorization checks. A check is never a bare boolean:
//! callers must be able to tell "not logged in" (401) from "logged in but
//! not allowed" (403), and both from "the store could not be queried"
//! (which travels as an error, not as a verdict).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Context attached to an ALLOW so the request layer can stash the resolved
/// roles/permissions/level on the request for downstream handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Granted {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub level: Option<i32>,
}

/// Why a check denied. Diagnostic fields carry the evaluated policy and what
/// the principal actually holds; never secrets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Denial {
    NotAuthenticated,
    NoRolesAssigned,
    NoPermissionsAssigned,
    MissingRole { required: Vec<String>, held: Vec<String> },
    MissingPermission { required: Vec<String>, held: Vec<String> },
    InsufficientLevel { required: i32, actual: i32 },
    NotOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allow(Granted),
    Deny(Denial),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow(_))
    }
}

impl Denial {
    /// Map to HTTP status code: missing identity is 401, every policy
    /// denial is 403.
    pub fn http_status(&self) -> u16 {
        match self {
            Denial::NotAuthenticated => 401,
            _ => 403,
        }
    }

    /// JSON body in the shape the gym frontend already consumes
    /// (`error` / `mensaje` plus the diagnostic fields per case).
    pub fn response_body(&self) -> Value {
        match self {
            Denial::NotAuthenticated => json!({
                "error": "No autenticado",
                "mensaje": "Debe iniciar sesión para acceder a este recurso",
            }),
            Denial::NoRolesAssigned => json!({
                "error": "Sin permisos",
                "mensaje": "No tiene roles asignados",
            }),
            Denial::NoPermissionsAssigned => json!({
                "error": "Sin permisos",
                "mensaje": "No tiene permisos asignados",
            }),
            Denial::MissingRole { required, held } => json!({
                "error": "Acceso denegado",
                "mensaje": format!("Requiere uno de estos roles: {}", required.join(", ")),
                "rolesActuales": held,
            }),
            Denial::MissingPermission { required, held } => json!({
                "error": "Permiso denegado",
                "mensaje": format!("Requiere uno de estos permisos: {}", required.join(", ")),
                "permisosActuales": held,
            }),
            Denial::InsufficientLevel { required, actual } => json!({
                "error": "Nivel insuficiente",
                "mensaje": format!("Requiere nivel {} o superior", required),
                "nivelActual": actual,
            }),
            Denial::NotOwner => json!({
                "error": "Acceso denegado",
                "mensaje": "Solo puede acceder a sus propios recursos o ser administrador",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(Denial::NotAuthenticated.http_status(), 401);
        assert_eq!(Denial::NoRolesAssigned.http_status(), 403);
        assert_eq!(Denial::NoPermissionsAssigned.http_status(), 403);
        assert_eq!(
            Denial::MissingRole { required: vec!["admin".into()], held: vec![] }.http_status(),
            403
        );
        assert_eq!(
            Denial::InsufficientLevel { required: 50, actual: 20 }.http_status(),
            403
        );
        assert_eq!(Denial::NotOwner.http_status(), 403);
    }

    #[test]
    fn response_bodies_carry_diagnostics() {
        let d = Denial::MissingRole {
            required: vec!["admin".into(), "entrenador".into()],
            held: vec!["cliente".into()],
        };
        let body = d.response_body();
        assert_eq!(body["error"], "Acceso denegado");
        assert_eq!(body["mensaje"], "Requiere uno de estos roles: admin, entrenador");
        assert_eq!(body["rolesActuales"][0], "cliente");

        let d = Denial::InsufficientLevel { required: 50, actual: 20 };
        let body = d.response_body();
        assert_eq!(body["mensaje"], "Requiere nivel 50 o superior");
        assert_eq!(body["nivelActual"], 20);
    }
}
