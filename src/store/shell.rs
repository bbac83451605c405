use serde::{Deserialize, Serialize};

use super::reducer::{Reducer, SliceAction, SliceState};
use crate::routing::NO_ROUTE;

/// Key of the slice the container registers up front.
pub const SHELL_SLICE: &str = "shell";

/// What the container itself knows: where it is and what it has mounted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellState {
    pub active_route: Option<String>,
    pub active_module: Option<String>,
    pub mounted: Vec<String>,
}

impl SliceState for ShellState {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ShellAction {
    #[serde(rename = "shell/routeChanged")]
    RouteChanged { path: String },
    #[serde(rename = "shell/routeNotFound")]
    RouteNotFound,
    #[serde(rename = "shell/moduleMounted")]
    ModuleMounted { module: String },
}

impl SliceAction for ShellAction {}

pub struct ShellReducer;

impl Reducer for ShellReducer {
    type State = ShellState;
    type Action = ShellAction;

    fn reduce(state: ShellState, action: ShellAction) -> ShellState {
        match action {
            ShellAction::RouteChanged { path } => ShellState {
                active_route: Some(path),
                ..state
            },
            ShellAction::RouteNotFound => ShellState {
                active_module: Some(NO_ROUTE.to_string()),
                ..state
            },
            ShellAction::ModuleMounted { module } => {
                let mut mounted = state.mounted;
                if module != NO_ROUTE && !mounted.contains(&module) {
                    mounted.push(module.clone());
                }
                ShellState {
                    active_route: state.active_route,
                    active_module: Some(module),
                    mounted,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_mounted_records_once() {
        let state = ShellReducer::reduce(
            ShellState::default(),
            ShellAction::ModuleMounted {
                module: "admin".to_string(),
            },
        );
        let state = ShellReducer::reduce(
            state,
            ShellAction::ModuleMounted {
                module: "admin".to_string(),
            },
        );
        assert_eq!(state.mounted, vec!["admin".to_string()]);
        assert_eq!(state.active_module.as_deref(), Some("admin"));
    }

    #[test]
    fn test_route_not_found_marks_sentinel() {
        let state = ShellReducer::reduce(ShellState::default(), ShellAction::RouteNotFound);
        assert_eq!(state.active_module.as_deref(), Some(NO_ROUTE));
        assert!(state.mounted.is_empty());
    }
}
