use super::types::ChangeSet;
use crate::actor::messages::BuildMsg;
use crate::config::ProjectConfig;

/// Convert a classified batch to BuildMsg(s).
pub(super) fn changes_to_messages(changes: ChangeSet, config: &ProjectConfig) -> Vec<BuildMsg> {
    // A config change reruns everything, nothing else matters
    if changes.config_changed {
        return vec![BuildMsg::ConfigChanged];
    }

    let mut messages = Vec::new();
    if !changes.stages.is_empty() {
        messages.push(BuildMsg::Run {
            stages: changes.stages,
        });
    }
    if let Some(reason) = reload_reason(&changes, config) {
        messages.push(BuildMsg::Reload { reason });
    }
    messages
}

fn reload_reason(changes: &ChangeSet, config: &ProjectConfig) -> Option<String> {
    match changes.reload.as_slice() {
        [] => None,
        [path] => Some(format!(
            "{} changed",
            crate::utils::path::to_slash(&config.root_relative(path))
        )),
        paths => Some(format!("{} files changed", paths.len())),
    }
}
