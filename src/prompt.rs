use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Select};
use pacpilot::{selection::Picker, Error, Result};
use std::io;

/// Terminal prompts. Escaping a prompt cancels the whole operation.
pub struct DialoguerPicker {
    theme: ColorfulTheme,
}

impl DialoguerPicker {
    pub fn new() -> Self {
        DialoguerPicker {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Picker for DialoguerPicker {
    fn pick_many(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>> {
        MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or(Error::UserCancelled)
    }

    fn pick_one(&self, prompt: &str, items: &[String]) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or(Error::UserCancelled)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact_opt()
            .map_err(prompt_error)?
            .ok_or(Error::UserCancelled)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_error)
    }
}

fn prompt_error(err: dialoguer::Error) -> Error {
    match err {
        dialoguer::Error::IO(err) if err.kind() == io::ErrorKind::Interrupted => {
            Error::UserCancelled
        }
        dialoguer::Error::IO(err) => Error::io("failed to read user input", err),
    }
}
