//! The prompt and status surface the library talks to the user through.
use std::io;

/// A request/response view of whatever the front-end uses to talk to the user.
///
/// `ask` blocks until the user answers. `say` is fire-and-forget status output.
/// The library never touches the terminal directly, so a GUI or a scripted
/// test double can stand in for the CLI.
pub trait Ui {
    fn ask(&mut self, question: &str) -> io::Result<String>;
    fn say(&mut self, message: &str);
}

impl<U: Ui + ?Sized> Ui for &mut U {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        (**self).ask(question)
    }

    fn say(&mut self, message: &str) {
        (**self).say(message)
    }
}
