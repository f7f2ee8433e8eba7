//! Model persistence.
//!
//! Checkpoints capture a model's named parameters as a flat value buffer
//! with enough metadata to rebuild and verify the architecture on load.
//! Pretrained embedding tables use a separate, simpler JSON schema.

mod load;
mod model;
mod save;

pub use load::{load_embedding_table, save_embedding_table, EmbeddingTable};
pub use model::{ModelMetadata, ModelState, ParameterInfo};
pub use save::{load_model, load_model_as, load_state, save_model, save_state, ModelFormat};
