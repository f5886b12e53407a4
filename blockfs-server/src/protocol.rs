//! Line protocol spoken by clients.
//!
//! A request is one line of at most three space separated parts: a command word
//! (case-insensitive), a file name, and for `WRITE` the rest of the line as content.
//! Every request gets exactly one reply line.

use blockfs::io::BlockStorage;
use blockfs::{BlockFs, FsError};
use log::error;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Create(&'a str),
    Delete(&'a str),
    Write(&'a str, &'a str),
    Read(&'a str),
    List,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("missing filename")]
    MissingFilename,
    #[error("missing filename or content")]
    MissingContent,
    #[error("Unknown command.")]
    Unknown,
}

pub fn parse<'a>(line: &'a str) -> Result<Command<'a>, ParseError> {
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parts = line.splitn(3, ' ');
    let word = parts.next().unwrap_or_default().to_ascii_uppercase();
    let name = parts.next();
    let content = parts.next();

    let named = |cmd: fn(&'a str) -> Command<'a>| name.map(cmd).ok_or(ParseError::MissingFilename);
    match word.as_str() {
        "CREATE" => named(Command::Create),
        "DELETE" => named(Command::Delete),
        "READ" => named(Command::Read),
        "WRITE" => match (name, content) {
            (Some(name), Some(content)) => Ok(Command::Write(name, content)),
            _ => Err(ParseError::MissingContent),
        },
        "LIST" => Ok(Command::List),
        "QUIT" => Ok(Command::Quit),
        _ => Err(ParseError::Unknown),
    }
}

/// What to send back for one request.
#[derive(Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// The connection should be closed once the reply is sent.
    pub close: bool,
}

impl Reply {
    fn line(text: String) -> Self {
        Self { text, close: false }
    }
}

fn render_error(err: FsError) -> String {
    if err.is_internal() {
        error!("storage failure: {:?}", err);
        return "ERROR: internal server error".to_string();
    }
    format!("ERROR: {}", err)
}

fn execute<T: BlockStorage>(fs: &BlockFs<T>, command: Command<'_>) -> Result<Reply, FsError> {
    let text = match command {
        Command::Create(name) => {
            fs.create(name)?;
            format!("SUCCESS: File '{}' created.", name)
        }
        Command::Delete(name) => {
            fs.delete(name)?;
            format!("SUCCESS: File '{}' deleted.", name)
        }
        Command::Write(name, content) => {
            fs.write(name, content.as_bytes())?;
            format!("SUCCESS: Data written to '{}'.", name)
        }
        Command::Read(name) => String::from_utf8_lossy(&fs.read(name)?).into_owned(),
        Command::List => {
            let names = fs.list();
            if names.is_empty() {
                "No files.".to_string()
            } else {
                names.join(",")
            }
        }
        Command::Quit => {
            return Ok(Reply {
                text: "SUCCESS: disconnecting.".to_string(),
                close: true,
            })
        }
    };
    Ok(Reply::line(text))
}

/// Parses and runs one request line against `fs`.
pub fn handle_line<T: BlockStorage>(fs: &BlockFs<T>, line: &str) -> Reply {
    match parse(line) {
        Ok(command) => execute(fs, command).unwrap_or_else(|err| Reply::line(render_error(err))),
        Err(err) => Reply::line(format!("ERROR: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockfs::io::{FileBlockEmulator, FileBlockEmulatorBuilder};
    use blockfs::DEVICE_BLOCKS;

    fn test_fs() -> BlockFs<FileBlockEmulator> {
        let dev = FileBlockEmulatorBuilder::from(tempfile::tempfile().unwrap())
            .with_block_count(DEVICE_BLOCKS)
            .build()
            .unwrap();
        BlockFs::new(dev).unwrap()
    }

    fn reply(fs: &BlockFs<FileBlockEmulator>, line: &str) -> String {
        handle_line(fs, line).text
    }

    #[test]
    fn parses_commands_case_insensitively() {
        assert_eq!(parse("create a.txt"), Ok(Command::Create("a.txt")));
        assert_eq!(parse("Delete a.txt"), Ok(Command::Delete("a.txt")));
        assert_eq!(parse("READ a.txt"), Ok(Command::Read("a.txt")));
        assert_eq!(parse("list"), Ok(Command::List));
        assert_eq!(parse("QUIT"), Ok(Command::Quit));
    }

    #[test]
    fn write_content_keeps_its_spaces() {
        assert_eq!(
            parse("WRITE a.txt hello  big world"),
            Ok(Command::Write("a.txt", "hello  big world"))
        );
    }

    #[test]
    fn malformed_requests_are_reported() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("CREATE"), Err(ParseError::MissingFilename));
        assert_eq!(parse("WRITE a.txt"), Err(ParseError::MissingContent));
        assert_eq!(parse("RENAME a b"), Err(ParseError::Unknown));
    }

    #[test]
    fn replies_follow_the_protocol() {
        let fs = test_fs();
        assert_eq!(reply(&fs, "LIST"), "No files.");
        assert_eq!(reply(&fs, "CREATE a.txt"), "SUCCESS: File 'a.txt' created.");
        assert_eq!(reply(&fs, "CREATE b.txt"), "SUCCESS: File 'b.txt' created.");
        assert_eq!(reply(&fs, "WRITE a.txt hi there"), "SUCCESS: Data written to 'a.txt'.");
        assert_eq!(reply(&fs, "READ a.txt"), "hi there");
        assert_eq!(reply(&fs, "READ b.txt"), "");
        assert_eq!(reply(&fs, "LIST"), "a.txt,b.txt");
        assert_eq!(reply(&fs, "DELETE a.txt"), "SUCCESS: File 'a.txt' deleted.");
        assert_eq!(reply(&fs, "LIST"), "b.txt");
    }

    #[test]
    fn engine_rejections_become_error_lines() {
        let fs = test_fs();
        assert_eq!(reply(&fs, "READ nope"), "ERROR: file does not exist");
        assert_eq!(reply(&fs, "CREATE twelve_chars"), "ERROR: filename too large");
        reply(&fs, "CREATE a");
        assert_eq!(reply(&fs, "CREATE a"), "ERROR: file already exists");
        let big = format!("WRITE a {}", "x".repeat(1300));
        assert_eq!(reply(&fs, &big), "ERROR: file too large");
        assert_eq!(reply(&fs, ""), "ERROR: empty command");
        assert_eq!(reply(&fs, "FORMAT"), "ERROR: Unknown command.");
    }

    #[test]
    fn quit_closes_the_connection() {
        let fs = test_fs();
        let quit = handle_line(&fs, "quit");
        assert!(quit.close);
        assert_eq!(quit.text, "SUCCESS: disconnecting.");
        assert!(!handle_line(&fs, "LIST").close);
    }
}
