use crate::ids::InstanceId;

/// Top-level views the core can send the user to.
///
/// 顶层视图路由。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Enrollment,
    SessionExpired,
    ClientHome { selected_instance: Option<InstanceId> },
}
