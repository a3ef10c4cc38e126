use colored::Colorize;

use super::CommandOutcome;

pub fn handle_command(input: &str) -> Result<CommandOutcome, String> {
    match input.to_lowercase().as_str() {
        "help" => {
            println!("\n🥗 Food Impact Commands:");
            println!("  <food>            - Analyze a food (e.g. Beef, Almond Milk)");
            println!("  analyze [food]    - Analyze the given food or the current query");
            println!("  search <text>     - Type a query and show suggestions");
            println!("  pick <n>          - Analyze suggestion number n");
            println!("  alt <n>           - Analyze alternative number n");
            println!("  dismiss           - Hide suggestions");
            println!("  clear             - Reset the session");
            println!("  status            - Show the current session");
            println!();

            println!("⚙️ Recommendation Settings:");
            println!("  ai on|off         - Toggle AI-ranked alternatives");
            println!("  limit <n>         - Number of alternatives to request (1-20)");
            println!();

            println!("🔧 System Commands:");
            println!("  help  - Show this help menu");
            println!("  exit  - Exit the program");
            println!();
            Ok(CommandOutcome::Continue)
        }
        "exit" | "quit" => {
            println!("{}", "👋 Goodbye!".green());
            Ok(CommandOutcome::Exit)
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}
