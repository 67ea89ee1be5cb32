use mothball_application::DecommissionService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub decommission_service: DecommissionService,
    pub function_key: String,
}
