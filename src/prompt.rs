//! Line-based interactive prompts.
//!
//! [`Prompter`] reads answers from any `BufRead` and writes questions to any
//! `Write`, so flows can be driven by scripted input in tests. Running out of
//! attempts is an [`GitprofError::InputExhausted`] error rather than a process exit.

use std::io::{self, BufRead, Write};

use crate::error::{GitprofError, Result};

pub const DEFAULT_ATTEMPTS: usize = 3;

const MANUAL_ENTRY_LABEL: &str = "enter value manually";

/// Result of a list prompt: the chosen value and whether it came from the fallback slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOption {
    pub value: String,
    pub is_fallback: bool,
}

impl SelectedOption {
    pub fn item(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_fallback: false,
        }
    }

    pub fn fallback(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_fallback: true,
        }
    }
}

type Validator<'a> = Box<dyn Fn(&str) -> bool + 'a>;

/// A free-text question
pub struct TextPrompt<'a> {
    question: String,
    default: Option<String>,
    show_default: bool,
    optional: bool,
    attempts: usize,
    validator: Option<Validator<'a>>,
    failure_message: String,
}

impl<'a> TextPrompt<'a> {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            default: None,
            show_default: true,
            optional: false,
            attempts: DEFAULT_ATTEMPTS,
            validator: None,
            failure_message: "Input failed validation. Please try again.".to_string(),
        }
    }

    /// Used for empty answers; ignored when `None` or empty
    pub fn with_default(mut self, default: Option<&str>) -> Self {
        self.default = default.filter(|d| !d.is_empty()).map(str::to_string);
        self
    }

    pub fn hide_default(mut self) -> Self {
        self.show_default = false;
        self
    }

    /// Accept an empty answer
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&str) -> bool + 'a) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_failure_message(mut self, msg: impl Into<String>) -> Self {
        self.failure_message = msg.into();
        self
    }

    fn render(&self) -> String {
        let mut question = self.question.clone();
        if let Some(default) = &self.default
            && self.show_default
        {
            question.push_str(&format!(" [default='{}']", default));
        }
        if !question.ends_with(':') {
            question.push(':');
        }
        question.push(' ');
        if self.optional {
            question.insert_str(0, "[OPTIONAL] ");
        }
        question
    }
}

/// A numbered menu with an optional synthetic fallback entry
pub struct ChoicePrompt {
    title: String,
    options: Vec<String>,
    fallback: Option<String>,
    /// Where the fallback goes; negative means end of list
    fallback_index: isize,
    enter_manually: bool,
    attempts: usize,
}

impl ChoicePrompt {
    pub fn new(title: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            title: title.into(),
            options,
            fallback: None,
            fallback_index: 0,
            enter_manually: false,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    /// Insert a fallback entry at `index` (negative: append)
    pub fn with_fallback(mut self, label: impl Into<String>, index: isize) -> Self {
        self.fallback = Some(label.into());
        self.fallback_index = index;
        self
    }

    /// The fallback slot asks for a free-text value instead
    pub fn enter_manually(mut self, index: isize) -> Self {
        self.fallback = Some(MANUAL_ENTRY_LABEL.to_string());
        self.fallback_index = index;
        self.enter_manually = true;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Final entries and the position of the fallback among them
    fn layout(&self) -> (Vec<String>, Option<usize>) {
        let mut entries = self.options.clone();
        let Some(label) = &self.fallback else {
            return (entries, None);
        };

        let label = format!("<{}>", label.trim().trim_matches(['<', '>']).to_uppercase());
        let slot = if self.fallback_index < 0 {
            entries.len()
        } else {
            (self.fallback_index as usize).min(entries.len())
        };
        entries.insert(slot, label);
        (entries, Some(slot))
    }
}

/// Asks questions over a reader/writer pair
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print a line to the prompt's output
    pub fn say(&mut self, msg: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", msg.as_ref())?;
        Ok(())
    }

    /// Read one trimmed line; end of input reads as empty
    fn read_answer(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Ask a free-text question, retrying on empty or rejected answers
    pub fn text(&mut self, prompt: &TextPrompt<'_>) -> Result<String> {
        let question = prompt.render();

        for _ in 0..prompt.attempts {
            let answer = self.read_answer(&question)?;

            if !answer.is_empty() {
                match &prompt.validator {
                    Some(valid) if !valid(&answer) => {
                        self.say(&prompt.failure_message)?;
                        continue;
                    }
                    _ => return Ok(answer),
                }
            }
            if let Some(default) = &prompt.default {
                return Ok(default.clone());
            }
            if prompt.optional {
                return Ok(String::new());
            }

            self.say("Bad input. Please try again.")?;
        }

        self.say("Failed to get valid input.")?;
        Err(GitprofError::InputExhausted {
            attempts: prompt.attempts,
        })
    }

    /// Yes/no question; an empty answer takes `default`
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let prompt = TextPrompt::new(format!("{} {}", question, hint))
            .with_default(Some(if default { "y" } else { "n" }))
            .hide_default()
            .with_validator(|a| matches!(a.to_lowercase().as_str(), "y" | "yes" | "n" | "no"))
            .with_failure_message("Please answer 'y' or 'n'.");

        let answer = self.text(&prompt)?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    /// Show a numbered menu and read a selection.
    ///
    /// An empty answer picks the fallback slot when it was placed explicitly,
    /// otherwise the first entry.
    pub fn choose(&mut self, prompt: &ChoicePrompt) -> Result<SelectedOption> {
        let (entries, fallback_slot) = prompt.layout();
        if entries.is_empty() {
            return Err(GitprofError::validation(format!(
                "Nothing to choose from for '{}'",
                prompt.title
            )));
        }

        let default_index = match fallback_slot {
            Some(slot) if prompt.fallback_index >= 0 => slot,
            _ => 0,
        };

        self.say("")?;
        self.say(format!("### {} ###", prompt.title))?;
        for (idx, entry) in entries.iter().enumerate() {
            self.say(format!("[{}] {}", idx, entry))?;
        }

        let question = format!(
            "Enter a number from the list to choose an option [default={}]: ",
            default_index
        );

        let mut chosen = None;
        for _ in 0..prompt.attempts {
            let answer = self.read_answer(&question)?;
            if answer.is_empty() {
                chosen = Some(default_index);
                break;
            }
            match answer.parse::<usize>() {
                Ok(idx) if idx < entries.len() => {
                    chosen = Some(idx);
                    break;
                }
                Ok(_) => self.say("Not a valid index. Please try again.")?,
                Err(_) => self.say("Not an integer. Please try again.")?,
            }
        }

        let Some(idx) = chosen else {
            self.say("Failed to get valid input.")?;
            return Err(GitprofError::InputExhausted {
                attempts: prompt.attempts,
            });
        };

        if Some(idx) != fallback_slot {
            return Ok(SelectedOption::item(entries[idx].clone()));
        }

        if prompt.enter_manually {
            let value = self.text(
                &TextPrompt::new("You chose to enter a value manually. Enter your value")
                    .with_attempts(prompt.attempts),
            )?;
            return Ok(SelectedOption::fallback(value));
        }

        Ok(SelectedOption::fallback(entries[idx].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(p: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn test_text_basic() {
        let mut p = prompter("  hello \n");
        let answer = p.text(&TextPrompt::new("Name")).unwrap();
        assert_eq!(answer, "hello");
        assert_eq!(output(p), "Name: ");
    }

    #[test]
    fn test_text_default_and_optional_rendering() {
        let mut p = prompter("\n\n");
        let answer = p
            .text(&TextPrompt::new("Email").with_default(Some("a@b.c")))
            .unwrap();
        assert_eq!(answer, "a@b.c");

        let answer = p.text(&TextPrompt::new("Username").optional()).unwrap();
        assert_eq!(answer, "");

        let out = output(p);
        assert!(out.contains("Email [default='a@b.c']: "));
        assert!(out.contains("[OPTIONAL] Username: "));
    }

    #[test]
    fn test_text_retries_then_succeeds() {
        let mut p = prompter("\nhas space\ngood\n");
        let prompt = TextPrompt::new("Key name").with_validator(|s| !s.contains(' '));

        assert_eq!(p.text(&prompt).unwrap(), "good");
        let out = output(p);
        assert!(out.contains("Bad input. Please try again."));
        assert!(out.contains("Input failed validation. Please try again."));
    }

    #[test]
    fn test_text_exhausted() {
        let mut p = prompter("\n\n\n");
        let err = p.text(&TextPrompt::new("Name")).unwrap_err();
        assert!(matches!(err, GitprofError::InputExhausted { attempts: 3 }));
    }

    #[test]
    fn test_text_end_of_input_exhausts() {
        let mut p = prompter("");
        let err = p
            .text(&TextPrompt::new("Name").with_attempts(2))
            .unwrap_err();
        assert!(matches!(err, GitprofError::InputExhausted { attempts: 2 }));
    }

    #[test]
    fn test_confirm() {
        let mut p = prompter("\nn\nmaybe\nYES\n");
        assert!(p.confirm("Open?", true).unwrap());
        assert!(!p.confirm("Open?", true).unwrap());
        assert!(p.confirm("Retry?", false).unwrap());
        assert!(output(p).contains("Please answer 'y' or 'n'."));
    }

    #[test]
    fn test_choose_item() {
        let mut p = prompter("1\n");
        let prompt = ChoicePrompt::new("Pick", vec!["a".into(), "b".into()]);
        assert_eq!(p.choose(&prompt).unwrap(), SelectedOption::item("b"));

        let out = output(p);
        assert!(out.contains("### Pick ###"));
        assert!(out.contains("[0] a\n[1] b\n"));
    }

    #[test]
    fn test_choose_fallback_at_end() {
        let mut p = prompter("2\n");
        let prompt = ChoicePrompt::new("Pick", vec!["a".into(), "b".into()])
            .with_fallback("create new profile", -1);

        let selected = p.choose(&prompt).unwrap();
        assert!(selected.is_fallback);
        assert_eq!(selected.value, "<CREATE NEW PROFILE>");
        assert!(output(p).contains("[2] <CREATE NEW PROFILE>"));
    }

    #[test]
    fn test_choose_fallback_at_start_is_default() {
        let mut p = prompter("\n");
        let prompt =
            ChoicePrompt::new("Key", vec!["id1".into()]).with_fallback("create new key", 0);

        let selected = p.choose(&prompt).unwrap();
        assert_eq!(selected, SelectedOption::fallback("<CREATE NEW KEY>"));
        assert!(output(p).contains("[0] <CREATE NEW KEY>\n[1] id1"));
    }

    #[test]
    fn test_choose_empty_answer_without_fallback_picks_first() {
        let mut p = prompter("\n");
        let prompt = ChoicePrompt::new("Pick", vec!["a".into()]);
        assert_eq!(p.choose(&prompt).unwrap(), SelectedOption::item("a"));
    }

    #[test]
    fn test_choose_enter_manually() {
        let mut p = prompter("0\nCodeberg\n");
        let prompt =
            ChoicePrompt::new("Service", vec!["GitHub".into()]).enter_manually(0);

        let selected = p.choose(&prompt).unwrap();
        assert_eq!(selected, SelectedOption::fallback("Codeberg"));
        assert!(output(p).contains("[0] <ENTER VALUE MANUALLY>"));
    }

    #[test]
    fn test_choose_invalid_then_valid() {
        let mut p = prompter("x\n7\n0\n");
        let prompt = ChoicePrompt::new("Pick", vec!["a".into()]);
        assert_eq!(p.choose(&prompt).unwrap(), SelectedOption::item("a"));

        let out = output(p);
        assert!(out.contains("Not an integer. Please try again."));
        assert!(out.contains("Not a valid index. Please try again."));
    }

    #[test]
    fn test_choose_exhausted() {
        let mut p = prompter("9\n9\n9\n");
        let prompt = ChoicePrompt::new("Pick", vec!["a".into()]);
        assert!(matches!(
            p.choose(&prompt),
            Err(GitprofError::InputExhausted { attempts: 3 })
        ));
    }

    #[test]
    fn test_choose_nothing() {
        let mut p = prompter("0\n");
        let prompt = ChoicePrompt::new("Pick", Vec::new());
        assert!(matches!(p.choose(&prompt), Err(GitprofError::Validation(_))));
    }
}
