//! Line-oriented command language
//!
//! One statement per line:
//!
//! ```text
//! # find the health counter and pin it
//! let hits = scan(100, Int32)
//! print("candidates:", count(hits))
//! writeInt(0x7FF6A000, 999)
//! return readInt(0x7FF6A000)
//! ```
//!
//! ## Statements
//! - `let name = expr` / `name = expr` - bind a variable
//! - `return expr` - stop and hand `expr` back to the host
//! - `expr` - evaluate for its effect
//!
//! Without an explicit `return`, a binding named `__result__` is returned.
//!
//! ## Literals
//! - integers: `42`, `-7`, `0x1F` (hex is unsigned)
//! - floats: `1.5`, `-2e3`
//! - strings: `"text"` or `'text'` with `\n \t \r \0 \\ \" \'` escapes
//! - `true`, `false`, `nil`
//! - data types: `Int32`, `uint8`, `DataType.FLOAT`, ...
//!
//! Byte arguments are hex strings (`"DEADBEEF"`, spaces allowed) or the
//! result of `readBytes`. There are no loops, no file access and no way to
//! start processes; the only effects are the [`ScriptApi`] operations.

use super::{ScriptApi, ScriptInterpreter, ScriptValue};
use crate::core::types::{Address, DataType, MemoryError, MemoryResult, Value};
use crate::memory::FilterKind;
use std::collections::HashMap;

/// Binding returned when a script has no `return`
pub const RESULT_BINDING: &str = "__result__";

type Eval<T> = Result<T, String>;

/// Interpreter for the built-in command language
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandInterpreter;

impl CommandInterpreter {
    pub fn new() -> Self {
        CommandInterpreter
    }
}

impl ScriptInterpreter for CommandInterpreter {
    fn name(&self) -> &str {
        "command"
    }

    fn execute(&self, code: &str, api: &mut ScriptApi) -> MemoryResult<Option<ScriptValue>> {
        let mut frame = Frame {
            api,
            vars: HashMap::new(),
        };

        for (index, line) in code.lines().enumerate() {
            let step = tokenize(line)
                .and_then(parse_statement)
                .and_then(|statement| match statement {
                    Some(statement) => frame.run(&statement),
                    None => Ok(Flow::Next),
                });

            match step {
                Ok(Flow::Next) => {}
                Ok(Flow::Return(value)) => return Ok(value),
                Err(message) => {
                    return Err(MemoryError::Script(format!("line {}: {}", index + 1, message)))
                }
            }
        }

        Ok(frame.vars.remove(RESULT_BINDING))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(ScriptValue),
    LParen,
    RParen,
    Comma,
    Assign,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Literal(value) => format!("literal {}", value),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Assign => "'='".to_string(),
        }
    }
}

fn tokenize(line: &str) -> Eval<Vec<Token>> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let starts_number = c.is_ascii_digit()
            || ((c == '-' || c == '+')
                && chars
                    .get(i + 1)
                    .map_or(false, |n| n.is_ascii_digit() || *n == '.'));

        match c {
            c if c.is_whitespace() => i += 1,
            '#' => break,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Assign);
                i += 1;
            }
            '"' | '\'' => {
                let (text, next) = string_literal(&chars, i)?;
                tokens.push(Token::Literal(ScriptValue::Value(Value::Text(text))));
                i = next;
            }
            _ if starts_number => {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let n = chars[i];
                    let exponent_sign = (n == '-' || n == '+')
                        && matches!(chars[i - 1], 'e' | 'E')
                        && !is_hex_prefix(&chars[start..i]);
                    if n.is_ascii_alphanumeric() || n == '.' || n == '_' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Literal(ScriptValue::Value(number_literal(&text)?)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

fn is_hex_prefix(chars: &[char]) -> bool {
    let digits = match chars.first() {
        Some('-') | Some('+') => &chars[1..],
        _ => chars,
    };
    digits.len() >= 2 && digits[0] == '0' && matches!(digits[1], 'x' | 'X')
}

/// Reads a quoted literal starting at `start`, returning it and the index past the closing quote
fn string_literal(chars: &[char], start: usize) -> Eval<(String, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((text, i + 1)),
            '\\' => {
                let escaped = chars.get(i + 1).ok_or("unterminated escape")?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => *other,
                });
                i += 2;
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    Err("unterminated string literal".to_string())
}

fn number_literal(text: &str) -> Eval<Value> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let magnitude = u64::from_str_radix(hex, 16)
            .map_err(|_| format!("invalid hex literal '{}'", text))?;
        if !negative {
            return Ok(Value::UInt(magnitude));
        }
        return i64::try_from(magnitude)
            .map(|m| Value::Int(-m))
            .map_err(|_| format!("hex literal out of range '{}'", text));
    }

    if digits.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return cleaned
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("invalid float literal '{}'", text));
    }

    if let Ok(v) = cleaned.parse::<i64>() {
        return Ok(Value::Int(v));
    }
    cleaned
        .parse::<u64>()
        .map(Value::UInt)
        .map_err(|_| format!("invalid number '{}'", text))
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(ScriptValue),
    Name(String),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Bind(String, Expr),
    Return(Option<Expr>),
    Eval(Expr),
}

const KEYWORDS: [&str; 5] = ["let", "return", "true", "false", "nil"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// `None` for blank and comment-only lines
fn parse_statement(tokens: Vec<Token>) -> Eval<Option<Statement>> {
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let statement = parser.statement()?;
    if let Some(extra) = parser.peek() {
        return Err(format!("unexpected {} after statement", extra.describe()));
    }
    Ok(Some(statement))
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn statement(&mut self) -> Eval<Statement> {
        match (self.tokens.first(), self.tokens.get(1)) {
            (Some(Token::Ident(k)), _) if k == "let" => {
                self.pos = 1;
                let name = self.binding_name()?;
                match self.next() {
                    Some(Token::Assign) => {}
                    _ => return Err(format!("expected '=' after 'let {}'", name)),
                }
                Ok(Statement::Bind(name, self.expr()?))
            }
            (Some(Token::Ident(k)), _) if k == "return" => {
                self.pos = 1;
                if self.peek().is_none() {
                    Ok(Statement::Return(None))
                } else {
                    Ok(Statement::Return(Some(self.expr()?)))
                }
            }
            (Some(Token::Ident(_)), Some(Token::Assign)) => {
                let name = self.binding_name()?;
                self.pos = 2;
                Ok(Statement::Bind(name, self.expr()?))
            }
            _ => Ok(Statement::Eval(self.expr()?)),
        }
    }

    fn binding_name(&mut self) -> Eval<String> {
        match self.next() {
            Some(Token::Ident(name)) if !KEYWORDS.contains(&name.as_str()) && !name.contains('.') => {
                Ok(name)
            }
            Some(other) => Err(format!("cannot bind to {}", other.describe())),
            None => Err("expected a name".to_string()),
        }
    }

    fn expr(&mut self) -> Eval<Expr> {
        match self.next() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Name(name));
                }
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                    return Ok(Expr::Call(name, args));
                }
                loop {
                    args.push(self.expr()?);
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        Some(other) => {
                            return Err(format!("expected ',' or ')' but found {}", other.describe()))
                        }
                        None => return Err(format!("missing ')' in call to {}", name)),
                    }
                }
                Ok(Expr::Call(name, args))
            }
            Some(other) => Err(format!("unexpected {}", other.describe())),
            None => Err("expected an expression".to_string()),
        }
    }
}

enum Flow {
    Next,
    Return(Option<ScriptValue>),
}

struct Frame<'a> {
    api: &'a mut ScriptApi,
    vars: HashMap<String, ScriptValue>,
}

fn api_error(e: MemoryError) -> String {
    e.to_string()
}

fn arity(name: &str, args: &[ScriptValue], min: usize, max: usize) -> Eval<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected,
            args.len()
        ));
    }
    Ok(())
}

fn address_arg(arg: &ScriptValue) -> Eval<Address> {
    match arg {
        ScriptValue::Value(Value::UInt(v)) => Ok(Address::new(*v as usize)),
        ScriptValue::Value(Value::Int(v)) if *v >= 0 => Ok(Address::new(*v as usize)),
        ScriptValue::Value(Value::Text(s)) => s.parse::<Address>().map_err(api_error),
        other => Err(format!("expected an address, got {}", other)),
    }
}

fn size_arg(arg: &ScriptValue) -> Eval<usize> {
    match arg {
        ScriptValue::Value(Value::UInt(v)) => Ok(*v as usize),
        ScriptValue::Value(Value::Int(v)) if *v >= 0 => Ok(*v as usize),
        other => Err(format!("expected a size, got {}", other)),
    }
}

fn type_arg(arg: &ScriptValue) -> Eval<DataType> {
    match arg {
        ScriptValue::Type(dt) => Ok(*dt),
        ScriptValue::Value(Value::Text(name)) => DataType::from_name(name).map_err(api_error),
        other => Err(format!("expected a data type, got {}", other)),
    }
}

fn value_arg(arg: &ScriptValue) -> Eval<Value> {
    match arg {
        ScriptValue::Value(v) => Ok(v.clone()),
        other => Err(format!("expected a value, got {}", other)),
    }
}

fn bytes_arg(arg: &ScriptValue) -> Eval<Vec<u8>> {
    match arg {
        ScriptValue::Bytes(bytes) => Ok(bytes.clone()),
        ScriptValue::Value(Value::Text(text)) => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(&compact).map_err(|e| format!("invalid hex bytes '{}': {}", text, e))
        }
        other => Err(format!("expected hex bytes, got {}", other)),
    }
}

/// Resolves a bare data type name, accepting a `DataType.` prefix
fn type_name(name: &str) -> Option<DataType> {
    let bare = name.strip_prefix("DataType.").unwrap_or(name);
    DataType::from_name(bare).ok()
}

impl Frame<'_> {
    fn run(&mut self, statement: &Statement) -> Eval<Flow> {
        match statement {
            Statement::Bind(name, expr) => {
                let value = self.eval(expr)?;
                self.vars.insert(name.clone(), value);
                Ok(Flow::Next)
            }
            Statement::Return(Some(expr)) => Ok(Flow::Return(Some(self.eval(expr)?))),
            Statement::Return(None) => Ok(Flow::Return(None)),
            Statement::Eval(expr) => {
                self.eval(expr)?;
                Ok(Flow::Next)
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Eval<ScriptValue> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self.resolve(name),
            Expr::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call(name, values)
            }
        }
    }

    fn resolve(&self, name: &str) -> Eval<ScriptValue> {
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        match name {
            "true" => Ok(ScriptValue::Bool(true)),
            "false" => Ok(ScriptValue::Bool(false)),
            "nil" => Ok(ScriptValue::Nil),
            _ => type_name(name)
                .map(ScriptValue::Type)
                .ok_or_else(|| format!("undefined name '{}'", name)),
        }
    }

    fn call(&mut self, name: &str, args: Vec<ScriptValue>) -> Eval<ScriptValue> {
        match name {
            "print" => {
                let line = args
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.api.print(line);
                Ok(ScriptValue::Nil)
            }
            "help" => {
                arity(name, &args, 0, 0)?;
                self.api.help();
                Ok(ScriptValue::Nil)
            }

            // Memory access
            "readBytes" => {
                arity(name, &args, 2, 2)?;
                let bytes = self
                    .api
                    .read_bytes(address_arg(&args[0])?, size_arg(&args[1])?)
                    .map_err(api_error)?;
                Ok(bytes.map_or(ScriptValue::Nil, ScriptValue::Bytes))
            }
            "readInt" => self.read_as(name, &args, DataType::Int32),
            "readInt64" => self.read_as(name, &args, DataType::Int64),
            "readFloat" => self.read_as(name, &args, DataType::Float),
            "readDouble" => self.read_as(name, &args, DataType::Double),
            "read" => {
                arity(name, &args, 2, 2)?;
                let data_type = type_arg(&args[1])?;
                self.read_as(name, &args[..1], data_type)
            }
            "readString" => {
                arity(name, &args, 1, 2)?;
                let length = match args.get(1) {
                    Some(arg) => size_arg(arg)?,
                    None => self.api.string_length(),
                };
                let text = self
                    .api
                    .read_string(address_arg(&args[0])?, length)
                    .map_err(api_error)?;
                Ok(text.map_or(ScriptValue::Nil, |t| ScriptValue::Value(Value::Text(t))))
            }
            "writeBytes" => {
                arity(name, &args, 2, 2)?;
                let written = self
                    .api
                    .write_bytes(address_arg(&args[0])?, &bytes_arg(&args[1])?)
                    .map_err(api_error)?;
                Ok(ScriptValue::Bool(written))
            }
            "writeInt" => self.write_as(name, &args, DataType::Int32),
            "writeInt64" => self.write_as(name, &args, DataType::Int64),
            "writeFloat" => self.write_as(name, &args, DataType::Float),
            "writeDouble" => self.write_as(name, &args, DataType::Double),
            "write" => {
                arity(name, &args, 3, 3)?;
                let data_type = type_arg(&args[2])?;
                self.write_as(name, &args[..2], data_type)
            }

            // Scanner
            "scan" => {
                arity(name, &args, 2, 2)?;
                let found = self
                    .api
                    .scan(&value_arg(&args[0])?, type_arg(&args[1])?)
                    .map_err(api_error)?;
                Ok(ScriptValue::Results(found))
            }
            "getResults" => {
                arity(name, &args, 0, 0)?;
                Ok(ScriptValue::Results(self.api.results().map_err(api_error)?))
            }
            "filter" => {
                arity(name, &args, 2, 3)?;
                let kind_name = match &args[0] {
                    ScriptValue::Value(Value::Text(kind)) => kind.clone(),
                    other => return Err(format!("expected a filter name, got {}", other)),
                };
                let data_type = type_arg(&args[1])?;
                let operand = args.get(2).map(value_arg).transpose()?;
                let kind = FilterKind::from_name(&kind_name, operand).map_err(api_error)?;
                self.filter_with(kind, data_type)
            }
            "filterChanged" => {
                arity(name, &args, 1, 1)?;
                self.filter_with(FilterKind::Changed, type_arg(&args[0])?)
            }
            "filterUnchanged" => {
                arity(name, &args, 1, 1)?;
                self.filter_with(FilterKind::Unchanged, type_arg(&args[0])?)
            }
            "count" => {
                arity(name, &args, 1, 1)?;
                let n = match &args[0] {
                    ScriptValue::Results(results) => results.len(),
                    ScriptValue::Bytes(bytes) => bytes.len(),
                    ScriptValue::Value(Value::Text(text)) => text.chars().count(),
                    ScriptValue::Nil => 0,
                    other => return Err(format!("cannot count {}", other)),
                };
                Ok(ScriptValue::Value(Value::UInt(n as u64)))
            }

            _ => Err(format!("unknown function '{}'", name)),
        }
    }

    fn read_as(&self, name: &str, args: &[ScriptValue], data_type: DataType) -> Eval<ScriptValue> {
        arity(name, args, 1, 1)?;
        let value = self
            .api
            .read_typed(address_arg(&args[0])?, data_type)
            .map_err(api_error)?;
        Ok(ScriptValue::from(value))
    }

    fn write_as(&self, name: &str, args: &[ScriptValue], data_type: DataType) -> Eval<ScriptValue> {
        arity(name, args, 2, 2)?;
        let written = self
            .api
            .write_typed(address_arg(&args[0])?, &value_arg(&args[1])?, data_type)
            .map_err(api_error)?;
        Ok(ScriptValue::Bool(written))
    }

    fn filter_with(&self, kind: FilterKind, data_type: DataType) -> Eval<ScriptValue> {
        let kept = self.api.filter(kind, data_type).map_err(api_error)?;
        Ok(ScriptValue::Results(kept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::regions::{enumerate, ProtectionFlags, DEFAULT_ADDRESS_CEILING};
    use crate::memory::{MemoryPort, MemoryScanner, ScanOptions};
    use crate::process::SimulatedProcess;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn run(code: &str, api: &mut ScriptApi) -> MemoryResult<Option<ScriptValue>> {
        CommandInterpreter::new().execute(code, api)
    }

    fn attached_api() -> (Arc<SimulatedProcess>, ScriptApi) {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(&100i32.to_ne_bytes());
        bytes[16..20].copy_from_slice(&100i32.to_ne_bytes());
        bytes[32..37].copy_from_slice(b"hello");
        let process = Arc::new(SimulatedProcess::new(7).with_region(
            0x1000,
            bytes,
            ProtectionFlags::PAGE_READWRITE,
        ));
        let regions = enumerate(process.as_ref(), DEFAULT_ADDRESS_CEILING);
        let port = MemoryPort::new(process.clone());
        let scanner = Arc::new(MemoryScanner::new(port.clone(), ScanOptions::sequential()));
        (process, ScriptApi::attached(port, scanner, regions, 16))
    }

    #[test]
    fn test_literals() {
        assert_eq!(number_literal("42").unwrap(), Value::Int(42));
        assert_eq!(number_literal("-7").unwrap(), Value::Int(-7));
        assert_eq!(number_literal("0x1F").unwrap(), Value::UInt(0x1F));
        assert_eq!(number_literal("-0x10").unwrap(), Value::Int(-16));
        assert_eq!(number_literal("18446744073709551615").unwrap(), Value::UInt(u64::MAX));
        assert_eq!(number_literal("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(number_literal("-2e3").unwrap(), Value::Float(-2000.0));
        assert!(number_literal("12abc").is_err());

        let tokens = tokenize(r#"print("a\"b", 'c\n') # trailing"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("print".into()),
                Token::LParen,
                Token::Literal(ScriptValue::Value(Value::from("a\"b"))),
                Token::Comma,
                Token::Literal(ScriptValue::Value(Value::from("c\n"))),
                Token::RParen,
            ]
        );
        assert!(tokenize("print(\"open").is_err());
        assert!(tokenize("a ; b").is_err());
    }

    #[test]
    fn test_bindings_and_return() {
        let mut api = ScriptApi::default();
        let value = run("let x = 5\n\n# comment\ny = x\nreturn y", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::Int(5))));

        let value = run("__result__ = Int32", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Type(DataType::Int32)));

        let value = run("return\nprint(1)", &mut api).unwrap();
        assert_eq!(value, None);
        assert_eq!(api.take_output(), "");

        assert_eq!(run("DataType.UINT8", &mut api).unwrap(), None);
        assert!(run("let return = 1", &mut api).is_err());
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let mut api = ScriptApi::default();
        let err = run("print(1)\nfrobnicate()", &mut api).unwrap_err();
        assert_eq!(err.to_string(), "Script error: line 2: unknown function 'frobnicate'");

        let err = run("readInt()", &mut api).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Script error: line 1: readInt() takes 1 argument(s), got 0"
        );

        let err = run("print(missing)", &mut api).unwrap_err();
        assert!(err.to_string().contains("undefined name 'missing'"));

        // memory operations need an attached session
        let err = run("readInt(0x1000)", &mut api).unwrap_err();
        assert!(err.to_string().contains("No process attached"));
    }

    #[test]
    fn test_print_joins_arguments() {
        let mut api = ScriptApi::default();
        run("print(\"a\", 1, 2.5, true, nil, Float)", &mut api).unwrap();
        assert_eq!(api.take_output(), "a 1 2.5 true nil Float");
    }

    #[test]
    fn test_memory_functions() {
        let (process, mut api) = attached_api();

        let value = run("return readInt(0x1000)", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::Int(100))));

        let value = run("return readInt(0x9000)", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Nil));

        run("writeInt(0x1004, -9)\nwriteBytes(4104, \"DE AD\")", &mut api).unwrap();
        assert_eq!(process.peek(0x1004, 4), Some((-9i32).to_ne_bytes().to_vec()));
        assert_eq!(process.peek(0x1008, 2), Some(vec![0xDE, 0xAD]));

        let value = run("return readBytes(0x1008, 2)", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Bytes(vec![0xDE, 0xAD])));

        let value = run("return readString(0x1020)", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::from("hello"))));
        let value = run("return readString(0x1020, 4)", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::from("hell"))));

        run("write(0x1030, 2.5, Double)", &mut api).unwrap();
        let value = run("return read(0x1030, \"double\")", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::Float(2.5))));

        assert!(run("writeInt(0x1000, 1.5e20)", &mut api).is_err());
    }

    #[test]
    fn test_scan_and_filter_functions() {
        let (process, mut api) = attached_api();

        run("let hits = scan(100, Int32)\nprint(count(hits))", &mut api).unwrap();
        assert_eq!(api.take_output(), "2");

        process.poke(0x1010, &150i32.to_ne_bytes());
        let value = run("return count(filterChanged(Int32))", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::UInt(1))));

        let value = run("return getResults()", &mut api).unwrap();
        match value {
            Some(ScriptValue::Results(results)) => {
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].address(), Address::new(0x1010));
            }
            other => panic!("unexpected {:?}", other),
        }

        let value = run("return count(filter(\">\", Int32, 200))", &mut api).unwrap();
        assert_eq!(value, Some(ScriptValue::Value(Value::UInt(0))));

        assert!(run("filter(\"sideways\", Int32)", &mut api).is_err());
    }
}
