use crate::error::{Error, Result};
use crate::ir::{DeclFile, Enum, EnumField, Function, Struct, TypeAlias, Value};
use crate::lexer::{HeaderScanner, ScanMode, Token, TokenKind};
use crate::macro_eval::{Evaluation, MacroEvaluator, MacroTable, ValueContext};
use crate::transform::rules::RuleSet;
use crate::transform::typetrans::UINT_TARGET;
use std::collections::HashMap;

/// `MIDL_INTERFACE("guid") Name` seen before `Name` is declared
#[derive(Debug, Clone)]
struct PendingGuid {
    target: String,
    guid: String,
    line: usize,
}

/// Declaration parser for one header file
///
/// Parsing happens in two phases. The token walk collects declarations and
/// GUID annotations into per-kind lists; [`HeaderParser::parse`] then links
/// GUIDs and vtables to their interface structs by name and reports anything
/// left unlinked.
pub struct HeaderParser<'r> {
    pub(super) scanner: HeaderScanner,
    pub(super) current: Token,
    pub(super) rules: &'r RuleSet,
    pub(super) macros: MacroTable,
    pub(super) file: DeclFile,
    structs: Vec<Struct>,
    vtables: Vec<Struct>,
    guids: Vec<PendingGuid>,
}

impl<'r> HeaderParser<'r> {
    pub fn new(filename: &str, source: &str, rules: &'r RuleSet) -> Self {
        HeaderParser {
            scanner: HeaderScanner::new(filename, source),
            current: Token::new(TokenKind::Newline, "\n", 1, 1),
            rules,
            macros: MacroTable::new(),
            file: DeclFile::new(filename),
            structs: Vec::new(),
            vtables: Vec::new(),
            guids: Vec::new(),
        }
    }

    /// Parses the whole file
    pub fn parse(mut self) -> Result<DeclFile> {
        loop {
            self.advance()?;
            if self.current.is_eof() {
                break;
            }
            if !matches!(self.current.kind, TokenKind::Identifier | TokenKind::Punct) {
                continue;
            }
            let keyword = self.current.lexeme.clone();
            match keyword.as_str() {
                "#" => self.parse_directive()?,
                "MIDL_INTERFACE" => self.parse_midl_interface()?,
                "typedef" => self.parse_typedef()?,
                "HRESULT" => self.parse_function()?,
                "interface" => self.parse_interface()?,
                _ => {}
            }
        }

        self.link()?;
        tracing::info!(
            "parsed {}: {} macros, {} enums, {} structs, {} functions",
            self.file.filename,
            self.file.macros.len(),
            self.file.enums.len(),
            self.file.structs.len(),
            self.file.functions.len()
        );
        Ok(self.file)
    }

    /// Resolves pending GUIDs and vtables against the collected structs
    fn link(&mut self) -> Result<()> {
        let mut structs = std::mem::take(&mut self.structs);
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, s) in structs.iter().enumerate() {
            index.entry(s.ident.clone()).or_insert(i);
        }

        for pending in self.guids.drain(..) {
            let Some(&i) = index.get(&pending.target) else {
                tracing::debug!("GUID at line {} names unknown struct", pending.line);
                return Err(Error::UnresolvedReference {
                    kind: "GUID".to_string(),
                    name: pending.target,
                });
            };
            structs[i].guid = Some(pending.guid);
        }

        for vtbl in self.vtables.drain(..) {
            let owner = vtbl
                .ident
                .strip_suffix("Vtbl")
                .and_then(|name| index.get(name).copied());
            let Some(i) = owner else {
                return Err(Error::UnresolvedReference {
                    kind: "vtable".to_string(),
                    name: vtbl.ident,
                });
            };
            structs[i].vtbl = Some(Box::new(vtbl));
        }

        self.file.structs = structs;
        Ok(())
    }

    // Dispatch targets

    /// `MIDL_INTERFACE("guid") Name`
    fn parse_midl_interface(&mut self) -> Result<()> {
        self.advance_expect("(")?;
        self.advance()?;
        let TokenKind::String(guid) = self.current.kind.clone() else {
            return Err(self.expected("GUID string"));
        };
        self.advance_expect(")")?;
        self.advance()?;
        let target = self.take_identifier("interface name")?;
        self.guids.push(PendingGuid {
            target: target.lexeme,
            guid,
            line: target.line,
        });
        Ok(())
    }

    fn parse_typedef(&mut self) -> Result<()> {
        self.advance()?;
        let kind = self.current.lexeme.clone();
        match kind.as_str() {
            "enum" => self.parse_enum(),
            "struct" => self.parse_struct(),
            "interface" => self.parse_interface_typedef(),
            "UINT" => {
                self.advance()?;
                let name = self.take_identifier("type name")?;
                self.file.type_aliases.push(TypeAlias {
                    ident: name.lexeme,
                    alias: UINT_TARGET.to_string(),
                });
                Ok(())
            }
            _ => self.parse_alias(),
        }
    }

    /// `typedef interface Name Name;` forward declaration. Leaves the current
    /// token on the `;` or `*` that follows.
    fn parse_interface_typedef(&mut self) -> Result<()> {
        self.advance()?;
        let target = self.take_identifier("interface name")?;
        self.advance()?;
        let name = self.take_identifier("type name")?;
        self.advance()?;
        if !(self.current.is(";") || self.current.is("*")) {
            return Err(self.expected("`;` or `*`"));
        }
        if self.current.is(";") && target.lexeme != name.lexeme {
            self.file.type_aliases.push(TypeAlias {
                ident: name.lexeme,
                alias: target.lexeme,
            });
        }
        Ok(())
    }

    /// `typedef KIND NAME;` with both sides plain identifiers
    fn parse_alias(&mut self) -> Result<()> {
        if !self.current.is_identifier() {
            return Ok(());
        }
        let kind = self.current.clone();
        self.advance()?;
        if !self.current.is_identifier() {
            return Ok(());
        }
        let name = self.current.clone();
        self.advance()?;
        if self.current.is(";") {
            self.file.type_aliases.push(TypeAlias {
                ident: name.lexeme,
                alias: kind.lexeme,
            });
        }
        Ok(())
    }

    /// `typedef enum [Tag] { A = expr, B, ... } Name`
    fn parse_enum(&mut self) -> Result<()> {
        self.advance()?;
        let tag = if self.current.is_identifier() {
            let tag = self.current.lexeme.clone();
            self.advance()?;
            Some(tag)
        } else {
            None
        };
        if !self.current.is("{") {
            return Ok(());
        }

        let mut fields: Vec<EnumField> = Vec::new();
        loop {
            self.advance()?;
            if self.current.is("}") {
                break;
            }
            let name = self.take_identifier("enum constant")?;
            self.advance()?;

            let value = if self.current.is("=") {
                let tokens = self.collect_initializer()?;
                let evaluator = MacroEvaluator::new(&self.macros);
                match evaluator.evaluate_expression(&name.lexeme, &tokens, ValueContext::EnumField)? {
                    Evaluation::Resolved(value) => value,
                    Evaluation::Skipped(reason) => {
                        tracing::debug!("enum constant {} kept raw: {}", name.lexeme, reason);
                        Value::Raw(join_tokens(&tokens))
                    }
                }
            } else {
                next_enum_value(fields.last())
            };

            self.macros.insert(name.lexeme.clone(), value.clone());
            fields.push(EnumField {
                ident: name.lexeme,
                value,
            });

            if self.current.is("}") {
                break;
            }
            if !self.current.is(",") {
                return Err(self.expected("`,` or `}`"));
            }
        }

        self.advance()?;
        let ident = match (self.current.is_identifier(), tag) {
            (true, _) => self.current.lexeme.clone(),
            (false, Some(tag)) => tag,
            (false, None) => return Err(self.expected("enum name")),
        };
        self.file.enums.push(Enum { ident, fields });
        Ok(())
    }

    /// Collects initializer tokens up to a `,` or `}` outside parentheses
    fn collect_initializer(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            self.advance()?;
            if self.current.is_eof() {
                return Err(self.expected("`,` or `}`"));
            }
            if depth == 0 && (self.current.is(",") || self.current.is("}")) {
                return Ok(tokens);
            }
            if self.current.is("(") {
                depth += 1;
            } else if self.current.is(")") {
                depth = depth.saturating_sub(1);
            }
            tokens.push(self.current.clone());
        }
    }

    /// `typedef struct [Tag] { fields } Name;`
    fn parse_struct(&mut self) -> Result<()> {
        self.advance()?;
        if self.current.is_identifier() {
            self.advance()?;
        }
        if !self.current.is("{") {
            return Ok(());
        }

        let fields = self.parse_fields(";", "}")?;
        self.advance()?;
        let name = self.take_identifier("struct name")?;
        self.advance_expect(";")?;

        let mut strukt = Struct::new(name.lexeme, fields);
        if strukt.is_vtable() {
            strukt.fields.remove(0);
            self.vtables.push(strukt);
        } else {
            self.structs.push(strukt);
        }
        Ok(())
    }

    /// `interface Name { fields };`
    fn parse_interface(&mut self) -> Result<()> {
        self.advance()?;
        let name = self.take_identifier("interface name")?;
        self.advance()?;
        if self.current.is(&name.lexeme) || self.current.is(";") {
            return Ok(());
        }
        self.expect_current("{")?;
        let fields = self.parse_fields(";", "}")?;
        self.structs.push(Struct::new(name.lexeme, fields));
        Ok(())
    }

    /// `HRESULT WINAPI Name(params);`
    fn parse_function(&mut self) -> Result<()> {
        self.advance()?;
        if !self.current.is("WINAPI") {
            return Ok(());
        }
        self.advance()?;
        let name = self.take_identifier("function name")?;
        self.advance_expect("(")?;
        let parameters = self.parse_fields(",", ")")?;
        self.advance_expect(";")?;

        self.file.functions.push(Function {
            ident: name.lexeme.clone(),
            dll_call: name.lexeme,
            parameters,
        });
        Ok(())
    }

    // Token helpers

    pub(super) fn advance(&mut self) -> Result<()> {
        self.current = self.scanner.next_token(ScanMode::Tokens)?;
        Ok(())
    }

    pub(super) fn advance_line(&mut self) -> Result<()> {
        self.current = self.scanner.next_token(ScanMode::Lines)?;
        Ok(())
    }

    pub(super) fn expect_current(&self, text: &str) -> Result<()> {
        if self.current.is(text) {
            Ok(())
        } else {
            Err(self.expected(&format!("`{}`", text)))
        }
    }

    pub(super) fn advance_expect(&mut self, text: &str) -> Result<()> {
        self.advance()?;
        self.expect_current(text)
    }

    /// Returns the current token if it is an identifier
    pub(super) fn take_identifier(&self, what: &str) -> Result<Token> {
        if self.current.is_identifier() {
            Ok(self.current.clone())
        } else {
            Err(self.expected(what))
        }
    }

    pub(super) fn expected(&self, expected: &str) -> Error {
        let got = if self.current.is_eof() {
            "end of file".to_string()
        } else {
            self.current.lexeme.clone()
        };
        Error::ParseError {
            file: self.file.filename.clone(),
            line: self.current.line,
            col: self.current.column,
            expected: expected.to_string(),
            got,
        }
    }
}

/// Value of an enum constant written without `=`
fn next_enum_value(previous: Option<&EnumField>) -> Value {
    match previous {
        None => Value::U32(0),
        Some(EnumField {
            value: Value::U32(n),
            ..
        }) => Value::U32(n.wrapping_add(1)),
        Some(field) => Value::Raw(format!("{} + 1", field.ident)),
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.lexeme.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses one header with the default rule table
pub fn parse_header(filename: &str, source: &str) -> Result<DeclFile> {
    let rules = RuleSet::default();
    HeaderParser::new(filename, source, &rules).parse()
}
