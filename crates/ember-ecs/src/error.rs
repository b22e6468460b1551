use ember_core::EntityId;

/// Errors from ECS structural operations. All are recoverable and local;
/// nothing in the ECS panics on normal misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("entity {0} already has a component of type {1}")]
    DuplicateComponent(EntityId, &'static str),
}
