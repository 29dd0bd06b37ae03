//! Entity-component storage: generational entities, sparse-set component
//! columns and the typed views that iterate them.

mod component;
mod entity;
mod registry;
mod view;

pub use component::SparseColumn;
pub use entity::Entity;
pub use registry::EntityRegistry;
pub use view::ViewParam;
