//! Preprocessor lines
//!
//! Only `#define` produces declarations. Every other directive (`#include`,
//! `#ifndef`, `#pragma`, ...) is consumed up to its line end and dropped.

use super::header_parser::HeaderParser;
use crate::error::Result;
use crate::ir::Macro;
use crate::macro_eval::{Evaluation, MacroEvaluator};

impl<'r> HeaderParser<'r> {
    /// Handles a directive with the current token on `#`
    pub(super) fn parse_directive(&mut self) -> Result<()> {
        self.advance_line()?;
        if self.current.ends_line() {
            return Ok(());
        }
        if self.current.is("define") {
            return self.parse_define();
        }
        self.skip_line()
    }

    fn parse_define(&mut self) -> Result<()> {
        self.advance_line()?;
        let name = self.take_identifier("macro name")?;

        let mut body = Vec::new();
        loop {
            self.advance_line()?;
            if self.current.ends_line() {
                break;
            }
            body.push(self.current.clone());
        }

        if self.rules.skips_macro(&name.lexeme) {
            tracing::debug!("skipping listed macro {}", name.lexeme);
            return Ok(());
        }

        let evaluation = MacroEvaluator::new(&self.macros).evaluate_define(&name, &body)?;
        match evaluation {
            Evaluation::Resolved(value) => {
                self.macros.insert(name.lexeme.clone(), value.clone());
                self.file.macros.push(Macro {
                    ident: name.lexeme,
                    value,
                });
            }
            Evaluation::Skipped(reason) => {
                tracing::debug!("skipping macro {}: {}", name.lexeme, reason);
            }
        }
        Ok(())
    }

    fn skip_line(&mut self) -> Result<()> {
        while !self.current.ends_line() {
            self.advance_line()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::ir::Value;
    use crate::parser::parse_header;

    #[test]
    fn test_defines_build_on_each_other() {
        let source = "#define D3D11_A 4\n#define D3D11_B ( D3D11_A * 2 )\n#define D3D11_C 0x10";
        let file = parse_header("t.h", source).unwrap();
        let values: Vec<_> = file.macros.iter().map(|m| (m.ident.as_str(), m.value.clone())).collect();
        assert_eq!(
            values,
            vec![
                ("D3D11_A", Value::U32(4)),
                ("D3D11_B", Value::U32(8)),
                ("D3D11_C", Value::U32(16)),
            ]
        );
    }

    #[test]
    fn test_other_directives_are_dropped() {
        let source = "#include \"rpc.h\"\n#ifndef __d3d11_h__\n#define __d3d11_h__\n#endif\ntypedef UINT X;";
        let file = parse_header("t.h", source).unwrap();
        assert!(file.macros.is_empty());
        assert_eq!(file.type_aliases.len(), 1);
    }

    #[test]
    fn test_continued_define() {
        let source = "#define MASK ( 1 | \\\n 2 )\n";
        let file = parse_header("t.h", source).unwrap();
        assert_eq!(file.macros[0].value, Value::U32(3));
    }

    #[test]
    fn test_listed_macros_are_skipped() {
        let source = "#define INTERFACE ID3D11Device\n#define D3DCOMPILER_DLL_A \"d3dcompiler_43.dll\"";
        let file = parse_header("t.h", source).unwrap();
        assert!(file.macros.is_empty());
    }

    #[test]
    fn test_skipped_macro_is_not_referenced() {
        let source = "#define F(x) x\n#define G ( F + 1 )\n";
        let file = parse_header("t.h", source).unwrap();
        assert!(file.macros.is_empty());
    }

    #[test]
    fn test_wide_hex_define_is_fatal() {
        let err = parse_header("t.h", "#define BIG 0x1234567890").unwrap_err();
        assert!(matches!(err, Error::MacroEvaluation { .. }));
    }
}
