//! Command palette entries and matching

use crate::ui::view::Screen;

/// What running a command does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  Products,
  AddProduct,
  Users,
  Quit,
}

impl CommandAction {
  /// Screen this command opens, if any
  pub fn screen(self) -> Option<Screen> {
    match self {
      CommandAction::Products => Some(Screen::Products),
      CommandAction::AddProduct => Some(Screen::AddProduct),
      CommandAction::Users => Some(Screen::Users),
      CommandAction::Quit => None,
    }
  }
}

#[derive(Debug)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "shop", "home"],
    description: "Browse the product catalogue",
    action: CommandAction::Products,
  },
  Command {
    name: "add",
    aliases: &["a", "new", "add-product"],
    description: "Add a new product",
    action: CommandAction::AddProduct,
  },
  Command {
    name: "users",
    aliases: &["u", "user"],
    description: "Show sample users",
    action: CommandAction::Users,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit storefront",
    action: CommandAction::Quit,
  },
];

/// How closely typed text matches a command word, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Closeness {
  Exact,
  Prefix,
  Contains,
}

impl Command {
  fn closeness(&self, input: &str) -> Option<Closeness> {
    std::iter::once(self.name)
      .chain(self.aliases.iter().copied())
      .filter_map(|word| {
        if word == input {
          Some(Closeness::Exact)
        } else if word.starts_with(input) {
          Some(Closeness::Prefix)
        } else if word.contains(input) {
          Some(Closeness::Contains)
        } else {
          None
        }
      })
      .min()
  }

  /// Whether running this command would reopen `screen`
  pub fn opens(&self, screen: &Screen) -> bool {
    self.action.screen().as_ref() == Some(screen)
  }
}

/// The command `input` names exactly, by name or alias.
pub fn lookup(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Commands matching `input`, closest first. Among equally close matches the
/// one for the screen already open goes last.
pub fn suggest(input: &str, current: &Screen) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  let mut ranked: Vec<(Closeness, bool, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let closeness = if input.is_empty() {
        Closeness::Exact
      } else {
        cmd.closeness(&input)?
      };
      Some((closeness, cmd.opens(current), cmd))
    })
    .collect();

  ranked.sort_by_key(|(closeness, here, _)| (*closeness, *here));
  ranked.into_iter().map(|(_, _, cmd)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(commands: &[&Command]) -> Vec<&'static str> {
    commands.iter().map(|c| c.name).collect()
  }

  #[test]
  fn test_empty_input_lists_current_screen_last() {
    assert_eq!(
      names(&suggest("", &Screen::Products)),
      vec!["add", "users", "quit", "products"]
    );
    assert_eq!(
      names(&suggest("", &Screen::Users)),
      vec!["products", "add", "quit", "users"]
    );
  }

  #[test]
  fn test_alias_beats_substring_even_on_current_screen() {
    // "p" is an alias of products and a substring of add-product
    assert_eq!(names(&suggest("p", &Screen::Products)), vec!["products", "add"]);
  }

  #[test]
  fn test_prefix_before_substring() {
    assert_eq!(names(&suggest("us", &Screen::AddProduct)), vec!["users"]);
    assert_eq!(names(&suggest("duct", &Screen::Users)), vec!["products", "add"]);
  }

  #[test]
  fn test_input_is_trimmed_and_case_folded() {
    assert_eq!(names(&suggest("  ADD ", &Screen::Products))[0], "add");
  }

  #[test]
  fn test_unknown_input_has_no_suggestions() {
    assert!(suggest("checkout", &Screen::Products).is_empty());
  }

  #[test]
  fn test_lookup_by_name_or_alias() {
    assert_eq!(lookup("users").map(|c| c.action), Some(CommandAction::Users));
    assert_eq!(lookup(" Exit ").map(|c| c.action), Some(CommandAction::Quit));
    assert!(lookup("use").is_none());
  }

  #[test]
  fn test_actions_map_to_screens() {
    assert_eq!(CommandAction::AddProduct.screen(), Some(Screen::AddProduct));
    assert_eq!(CommandAction::Quit.screen(), None);
    assert!(COMMANDS[0].opens(&Screen::Products));
  }
}
