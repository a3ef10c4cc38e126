use crate::food::api::FoodApi;
use crate::food::search::SearchOrchestrator;

pub mod food_cmd;
mod system;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Exit,
}

/// Terminal front end for one search session.
pub struct CommandHandler<A: FoodApi + 'static> {
    search: SearchOrchestrator<A>,
}

impl<A: FoodApi + 'static> CommandHandler<A> {
    pub fn new(search: SearchOrchestrator<A>) -> Self {
        Self { search }
    }

    pub fn search(&self) -> &SearchOrchestrator<A> {
        &self.search
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<CommandOutcome, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(CommandOutcome::Continue);
        }

        match input.to_lowercase().as_str() {
            "help" | "exit" | "quit" => return system::handle_command(input),
            _ => {}
        }

        food_cmd::handle_command(input, &self.search).await?;
        Ok(CommandOutcome::Continue)
    }
}
