use super::Command;
use crate::error::EditorResult;
use crate::scene::SceneDocument;

/// Manages the history of executed commands for undo/redo functionality
pub struct CommandHistory {
    /// Stack of commands that can be undone
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone
    redo_stack: Vec<Command>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// Creates a new empty command history
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Execute a command and add it to the history if it changed anything
    pub fn execute(&mut self, mut command: Command, doc: &mut SceneDocument) -> EditorResult<()> {
        command.execute(doc)?;

        if command.can_undo() {
            self.undo_stack.push(command);
            self.redo_stack.clear();
        }

        Ok(())
    }

    /// Undo the last executed command. Returns false when there is nothing
    /// to undo.
    pub fn undo(&mut self, doc: &mut SceneDocument) -> bool {
        let Some(command) = self.undo_stack.pop() else {
            return false;
        };
        command.undo(doc);
        self.redo_stack.push(command);
        true
    }

    /// Redo the last undone command. Returns false when there is nothing
    /// to redo.
    pub fn redo(&mut self, doc: &mut SceneDocument) -> bool {
        let Some(mut command) = self.redo_stack.pop() else {
            return false;
        };
        if command.execute(doc).is_err() {
            return false;
        }
        self.undo_stack.push(command);
        true
    }

    /// Returns true if there are commands that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are commands that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear the command history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
