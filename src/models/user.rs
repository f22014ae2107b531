use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    WebAccess,
    AppScanner,
    AppTripCreator,
    AppAdmin,
    AppTripDriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseLocation {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppUser {
    pub id: String,
    pub person_name: String,
    pub mobile: String,
    pub base_location_id: String,
    #[serde(default)]
    pub vehicle_nbr: Option<String>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Identity of the user behind a request, resolved from the user directory.
#[derive(Debug, Clone, Serialize)]
pub struct Caller {
    pub id: String,
    pub username: String,
    pub mobile: String,
    pub base_location_id: String,
    pub base_location_name: String,
    pub roles: Vec<UserRole>,
}

impl Caller {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}
