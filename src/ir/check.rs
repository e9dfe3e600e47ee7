//! FileCheck-style test validation for superword IR files.
//!
//! A test file is ordinary IR with `; RUN:` and `; CHECK...` comment lines.
//! The runner parses the IR, runs the pass in-process the way the RUN line
//! asks, and matches the produced text against the CHECK directives, much
//! like LLVM's FileCheck.

use super::Module;
use crate::core::analyzer::DominatorTree;
use crate::core::config::{CodegenMode, PassConfig};
use crate::slp::SlpPass;

/// A CHECK directive extracted from a test file
#[derive(Debug, Clone, PartialEq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match on this or a later line
    Check(String),
    /// CHECK-LABEL: pattern - Label for a section
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Match on the next line
    CheckNext(String),
    /// CHECK-NOT: pattern - Must not occur before the next positive match
    CheckNot(String),
    /// CHECK-EMPTY - Match empty line
    CheckEmpty,
    /// COM: comment - Comment, ignored
    Comment(String),
}

/// A RUN directive specifying how to execute the test
#[derive(Debug, Clone)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

impl RunDirective {
    fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    /// Values following every occurrence of `flag`.
    fn values_of(&self, flag: &str) -> Vec<String> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].clone())
            .collect()
    }
}

/// Test specification extracted from a test file
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub ir_content: String,
}

const DIRECTIVES: &[(&str, fn(String) -> CheckDirective)] = &[
    ("; CHECK-LABEL:", CheckDirective::CheckLabel),
    ("; CHECK-NEXT:", CheckDirective::CheckNext),
    ("; CHECK-NOT:", CheckDirective::CheckNot),
    ("; CHECK:", CheckDirective::Check),
    ("; COM:", CheckDirective::Comment),
];

impl TestSpec {
    /// Split a test file into RUN lines, CHECK lines and IR
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut ir_lines = Vec::new();

        'lines: for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let parts: Vec<&str> = run_cmd.split_whitespace().collect();
                if parts.is_empty() {
                    return Err("empty RUN directive".to_string());
                }
                run_directives.push(RunDirective {
                    command: parts[0].to_string(),
                    args: parts[1..].iter().map(|s| s.to_string()).collect(),
                });
                continue;
            }
            if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
                continue;
            }
            for (prefix, make) in DIRECTIVES {
                if let Some(pattern) = trimmed.strip_prefix(prefix) {
                    check_directives.push(make(pattern.trim().to_string()));
                    continue 'lines;
                }
            }
            ir_lines.push(line);
        }

        Ok(TestSpec {
            run_directives,
            check_directives,
            ir_content: ir_lines.join("\n"),
        })
    }
}

/// Test runner that executes IR tests
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run every RUN line of a test and validate its output
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), String> {
        if spec.run_directives.is_empty() {
            return Err("test has no RUN directive".to_string());
        }
        for run_dir in &spec.run_directives {
            let output = self.execute_command(&spec.ir_content, run_dir)?;
            self.validate_output(&output, &spec.check_directives)?;
        }
        Ok(())
    }

    /// Execute one RUN line and return the text it produces
    ///
    /// Recognized flags: `--print-rpo` (block order of every function before
    /// the pass), `--analyze-only`, `--function <name>`, `--print-ir` (IR after
    /// the pass) and `--stats` (the chain report).
    pub fn execute_command(&self, ir: &str, run_dir: &RunDirective) -> Result<String, String> {
        let mut module = Module::parse(ir).map_err(|e| e.to_string())?;
        let mut output = Vec::new();

        if run_dir.has_flag("--print-rpo") {
            for func in module.functions.iter().filter(|f| !f.declaration) {
                output.push(format!("RPO for func {}", func.name));
                let tree = DominatorTree::compute(func);
                for (idx, &block) in tree.order().iter().enumerate() {
                    output.push(format!("{}: {}", idx, func.block_name(block)));
                }
                output.push("End RPO".to_string());
            }
        }

        let mut config = PassConfig::default();
        if run_dir.has_flag("--analyze-only") {
            config = config.with_mode(CodegenMode::AnalyzeOnly);
        }
        let functions = run_dir.values_of("--function");
        if !functions.is_empty() {
            config = config.with_functions(functions);
        }

        let pass = SlpPass::new(config).map_err(|e| e.to_string())?;
        let stats = pass.run_on_module(&mut module).map_err(|e| e.to_string())?;

        if run_dir.has_flag("--print-ir") {
            output.push("Printing IR".to_string());
            output.push(module.to_string());
        }
        if run_dir.has_flag("--stats") {
            output.push(stats.to_string());
        }

        Ok(output.join("\n"))
    }

    /// Validate output against CHECK directives
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), String> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;
        let mut forbidden: Vec<&str> = Vec::new();

        for directive in directives {
            match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::CheckNot(pattern) => forbidden.push(pattern),

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));

                    match found {
                        Some(idx) => {
                            Self::reject_forbidden(&forbidden, &output_lines[line_idx..line_idx + idx])?;
                            forbidden.clear();
                            line_idx += idx + 1;
                            if self.verbose {
                                println!("{:?} found at line {}", directive, line_idx - 1);
                            }
                        }
                        None => {
                            return Err(format!("{:?}: pattern not found in output", directive));
                        }
                    }
                }

                CheckDirective::CheckNext(pattern) => {
                    if line_idx >= output_lines.len() {
                        return Err(format!("CHECK-NEXT: no more lines, expected '{}'", pattern));
                    }

                    let line = output_lines[line_idx];
                    if !line.contains(pattern.as_str()) {
                        return Err(format!(
                            "CHECK-NEXT: expected '{}' but got '{}'",
                            pattern, line
                        ));
                    }
                    forbidden.clear();

                    if self.verbose {
                        println!("CHECK-NEXT: '{}' matches at line {}", pattern, line_idx);
                    }
                    line_idx += 1;
                }

                CheckDirective::CheckEmpty => {
                    if line_idx >= output_lines.len() {
                        continue; // End of output counts as empty
                    }

                    let line = output_lines[line_idx];
                    if !line.trim().is_empty() {
                        return Err(format!(
                            "CHECK-EMPTY: expected empty line but got '{}'",
                            line
                        ));
                    }
                    line_idx += 1;
                }
            }
        }

        let rest = output_lines.get(line_idx..).unwrap_or(&[]);
        Self::reject_forbidden(&forbidden, rest)
    }

    fn reject_forbidden(forbidden: &[&str], lines: &[&str]) -> Result<(), String> {
        for pattern in forbidden {
            if let Some(line) = lines.iter().find(|line| line.contains(pattern)) {
                return Err(format!("CHECK-NOT: '{}' found in '{}'", pattern, line));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        let content = r#"; RUN: superword-opt --print-ir --function f %s
; CHECK: Printing IR
; CHECK-LABEL: define void @f
; CHECK-NEXT: entry:
; CHECK-NOT: store
; COM: This is a comment
define void @f() {
entry:
  ret void
}"#;

        let spec = TestSpec::parse(content).unwrap();
        assert_eq!(spec.run_directives.len(), 1);
        assert_eq!(spec.run_directives[0].values_of("--function"), vec!["f".to_string()]);
        assert_eq!(spec.check_directives.len(), 5);
        assert_eq!(spec.check_directives[3], CheckDirective::CheckNot("store".to_string()));
        assert!(spec.ir_content.contains("define void @f()"));
    }

    #[test]
    fn test_check_matching() {
        let runner = TestRunner::new(false);
        let output = "Printing IR\ndefine void @f() {\nentry:\n";

        let directives = vec![
            CheckDirective::Check("Printing IR".to_string()),
            CheckDirective::CheckLabel("@f".to_string()),
            CheckDirective::CheckNext("entry:".to_string()),
        ];

        runner.validate_output(output, &directives).unwrap();
    }

    #[test]
    fn test_check_next_failure() {
        let runner = TestRunner::new(false);
        let output = "Line 1\nLine 2\nLine 3\n";

        let directives = vec![
            CheckDirective::Check("Line 1".to_string()),
            CheckDirective::CheckNext("Line 3".to_string()),
        ];

        let result = runner.validate_output(output, &directives);
        assert!(result.unwrap_err().contains("CHECK-NEXT"));
    }

    #[test]
    fn test_check_not() {
        let runner = TestRunner::new(false);
        let output = "load a\nadd\nstore b\n";

        let ok = vec![
            CheckDirective::Check("load".to_string()),
            CheckDirective::CheckNot("mul".to_string()),
            CheckDirective::Check("store".to_string()),
        ];
        runner.validate_output(output, &ok).unwrap();

        let bad = vec![
            CheckDirective::Check("load".to_string()),
            CheckDirective::CheckNot("add".to_string()),
            CheckDirective::Check("store".to_string()),
        ];
        assert!(runner.validate_output(output, &bad).unwrap_err().contains("CHECK-NOT"));

        let trailing = vec![CheckDirective::CheckNot("store".to_string())];
        assert!(runner.validate_output(output, &trailing).is_err());
    }

    #[test]
    fn test_runs_pass_in_process() {
        let content = r#"; RUN: superword-opt --stats %s
; CHECK: SLP Results:
; CHECK-NEXT: Size: Count
; CHECK-NEXT:  1: 0
define void @f() {
entry:
  ret void
}"#;
        let spec = TestSpec::parse(content).unwrap();
        TestRunner::new(false).run_test(&spec).unwrap();
    }
}
