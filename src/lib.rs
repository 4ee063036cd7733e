#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod assets;
pub mod canvas;
pub mod codec;
pub mod command;
pub mod error;
pub mod panels;
pub mod public;
pub mod remote;
pub mod render;
pub mod scene;
pub mod session;
pub mod tools;
pub mod util;
pub mod viewport;

pub use app::CardStudioApp;
pub use command::{Command, CommandHistory};
pub use error::{EditorError, EditorResult, SessionError};
pub use public::PublicSession;
pub use remote::{TemplateId, TemplateStore};
pub use scene::{ObjectId, SceneDocument, SceneObject};
pub use session::EditorSession;
