//! Property-based tests for the composer and command parsing.

use proptest::prelude::*;
use taskdeck_app::{
    App, AppAction, AppEvent, InputState, KeyInput,
    commands::{self, Command},
};
use taskdeck_proto::UserId;

/// Composer edits, including multi-byte characters.
fn edit_strategy() -> impl Strategy<Value = KeyInput> {
    prop_oneof![
        4 => prop_oneof![prop::char::range(' ', '~'), Just('é'), Just('日')].prop_map(KeyInput::Char),
        1 => Just(KeyInput::Backspace),
        1 => Just(KeyInput::Delete),
        1 => Just(KeyInput::Left),
        1 => Just(KeyInput::Right),
        1 => Just(KeyInput::Home),
        1 => Just(KeyInput::End),
    ]
}

fn apply(input: &mut InputState, key: &KeyInput) {
    match key {
        KeyInput::Char(c) => input.insert(*c),
        KeyInput::Backspace => {
            input.backspace();
        },
        KeyInput::Delete => {
            input.delete();
        },
        KeyInput::Left => input.left(),
        KeyInput::Right => input.right(),
        KeyInput::Home => input.home(),
        KeyInput::End => input.end(),
        _ => {},
    }
}

proptest! {
    /// The cursor never leaves the buffer, whatever the edits.
    #[test]
    fn prop_cursor_stays_in_buffer(keys in prop::collection::vec(edit_strategy(), 0..80)) {
        let mut input = InputState::new();
        for key in &keys {
            apply(&mut input, key);
            prop_assert!(input.cursor() <= input.buffer().chars().count());
        }
    }

    /// Typing at the end of the buffer appends exactly the typed text.
    #[test]
    fn prop_typed_text_is_taken_back(text in "[a-zA-Z0-9 éü]{0,40}") {
        let mut input = InputState::new();
        for c in text.chars() {
            input.insert(c);
        }
        prop_assert_eq!(input.take(), text);
        prop_assert!(input.buffer().is_empty());
        prop_assert_eq!(input.cursor(), 0);
    }

    /// Text without a leading slash always parses as a message, verbatim.
    #[test]
    fn prop_plain_text_is_message(text in "[^/][^\n]{0,40}") {
        prop_assert_eq!(commands::parse(&text), Command::Message { text: text.clone() });
    }

    /// Composing a slash command never signals typing to anyone.
    #[test]
    fn prop_commands_never_count_as_typing(rest in "[a-z ]{0,20}") {
        let mut app = App::new(UserId::from("me"));
        for c in format!("/{rest}").chars() {
            let actions = app.handle(AppEvent::Key(KeyInput::Char(c)));
            prop_assert!(!actions.contains(&AppAction::Keystroke));
        }
    }
}
