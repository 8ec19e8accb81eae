//! Interactive update confirmation

use std::io::IsTerminal;
use std::sync::Arc;

use inquire::{Confirm, InquireError};

use super::error::PromptError;

/// Yes/no confirmation source.
///
/// `confirm` is only called when `can_prompt` returns true.
pub trait Confirmer: Send + Sync {
    /// True when a human can answer a prompt.
    fn can_prompt(&self) -> bool;

    /// Ask `question`; `Ok(false)` means the user declined.
    fn confirm(&self, question: &str) -> Result<bool, PromptError>;
}

impl<T: Confirmer + ?Sized> Confirmer for Arc<T> {
    fn can_prompt(&self) -> bool {
        (**self).can_prompt()
    }

    fn confirm(&self, question: &str) -> Result<bool, PromptError> {
        (**self).confirm(question)
    }
}

/// Terminal prompt backed by `inquire`
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn can_prompt(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }

    fn confirm(&self, question: &str) -> Result<bool, PromptError> {
        match Confirm::new(question).with_default(false).prompt() {
            Ok(answer) => Ok(answer),
            // Esc and Ctrl-C at the prompt are a "no"
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Confirmer with a fixed answer, for scripted environments.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmer {
    interactive: bool,
    answer: bool,
}

impl FixedConfirmer {
    /// Always answers `answer`.
    pub fn answering(answer: bool) -> Self {
        Self {
            interactive: true,
            answer,
        }
    }

    /// Reports that no prompt is possible.
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            answer: false,
        }
    }
}

impl Confirmer for FixedConfirmer {
    fn can_prompt(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, _question: &str) -> Result<bool, PromptError> {
        Ok(self.answer)
    }
}

/// Question shown before replacing the executable.
pub fn question(latest: &str) -> String {
    format!("Are you sure you want to update to {latest} ?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_names_the_release() {
        assert_eq!(question("v1.1.0"), "Are you sure you want to update to v1.1.0 ?");
    }

    #[test]
    fn fixed_confirmer_answers() {
        assert!(FixedConfirmer::answering(true).confirm("?").unwrap());
        assert!(!FixedConfirmer::answering(false).confirm("?").unwrap());
        assert!(!FixedConfirmer::non_interactive().can_prompt());
    }
}
