//! Preprocessor event log.
//!
//! Every directive, inclusion and expansion is reported with offsets into the
//! unexpanded text of the file it occurs in. The scanner always records events
//! in its [`LocationMap`](crate::LocationMap); an optional [`PreprocessorLog`]
//! sink receives the same events as they happen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cidx_diagnostic::Diagnostic;
use cidx_ir::{FileId, Name, Span};

use crate::macros::MacroDef;

/// Receiver of preprocessor events. Every callback defaults to a no-op.
#[allow(unused_variables)]
pub trait PreprocessorLog {
    fn start_translation_unit(&mut self, file: FileId, path: &Path) {}
    fn end_translation_unit(&mut self, file: FileId, offset: u32) {}

    /// `directive` spans the `#include` line in `file`.
    fn start_inclusion(&mut self, file: FileId, directive: Span, included: FileId, path: &Path) {}
    /// `offset` is the end of the included file's text.
    fn end_inclusion(&mut self, included: FileId, offset: u32) {}

    fn start_object_style_expansion(&mut self, name: Name, file: FileId, invocation: Span) {}
    fn end_object_style_expansion(&mut self, name: Name, file: FileId, invocation: Span) {}
    fn start_function_style_expansion(&mut self, name: Name, file: FileId, invocation: Span) {}
    fn end_function_style_expansion(&mut self, name: Name, file: FileId, invocation: Span) {}

    fn define_object_style_macro(&mut self, def: &MacroDef) {}
    fn define_function_style_macro(&mut self, def: &MacroDef) {}

    fn encounter_pound_if(&mut self, file: FileId, directive: Span, taken: bool) {}
    fn encounter_pound_ifdef(&mut self, file: FileId, directive: Span, name: Name, taken: bool) {}
    fn encounter_pound_ifndef(&mut self, file: FileId, directive: Span, name: Name, taken: bool) {}
    fn encounter_pound_elif(&mut self, file: FileId, directive: Span, taken: bool) {}
    fn encounter_pound_else(&mut self, file: FileId, directive: Span, taken: bool) {}
    fn encounter_pound_endif(&mut self, file: FileId, directive: Span) {}
    fn encounter_pound_pragma(&mut self, file: FileId, directive: Span) {}
    fn encounter_pound_error(&mut self, file: FileId, directive: Span) {}
    fn encounter_pound_warning(&mut self, file: FileId, directive: Span) {}
    fn encounter_pound_line(&mut self, file: FileId, directive: Span) {}
    fn encounter_pound_undef(&mut self, file: FileId, directive: Span, name: Name, was_defined: bool) {}
    /// `resolved` is `None` when the header could not be found.
    fn encounter_pound_include(
        &mut self,
        file: FileId,
        directive: Span,
        header: &str,
        system: bool,
        resolved: Option<&Path>,
    ) {
    }

    fn encounter_problem(&mut self, problem: &Diagnostic) {}
}

/// Which conditional directive a [`LogEntry::Conditional`] records.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConditionalKind {
    If,
    Ifdef(Name),
    Ifndef(Name),
    Elif,
    Else,
    Endif,
}

/// Which simple directive a [`LogEntry::Directive`] records.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DirectiveKind {
    Pragma,
    Error,
    Warning,
    Line,
}

/// One recorded event.
#[derive(Clone, Debug)]
pub enum LogEntry {
    StartTranslationUnit {
        file: FileId,
        path: PathBuf,
    },
    EndTranslationUnit {
        file: FileId,
        offset: u32,
    },
    StartInclusion {
        file: FileId,
        directive: Span,
        included: FileId,
        path: PathBuf,
    },
    EndInclusion {
        included: FileId,
        offset: u32,
    },
    StartExpansion {
        name: Name,
        file: FileId,
        invocation: Span,
        function_style: bool,
    },
    EndExpansion {
        name: Name,
        file: FileId,
        invocation: Span,
        function_style: bool,
    },
    Define(Arc<MacroDef>),
    Undef {
        file: FileId,
        directive: Span,
        name: Name,
        was_defined: bool,
    },
    Conditional {
        kind: ConditionalKind,
        file: FileId,
        directive: Span,
        /// For `#endif`, always true.
        taken: bool,
    },
    Directive {
        kind: DirectiveKind,
        file: FileId,
        directive: Span,
    },
    Include {
        file: FileId,
        directive: Span,
        header: String,
        system: bool,
        resolved: Option<PathBuf>,
    },
    Problem(Diagnostic),
}

impl LogEntry {
    /// Forward this event to `log`.
    pub fn dispatch(&self, log: &mut dyn PreprocessorLog) {
        match self {
            LogEntry::StartTranslationUnit { file, path } => log.start_translation_unit(*file, path),
            LogEntry::EndTranslationUnit { file, offset } => log.end_translation_unit(*file, *offset),
            LogEntry::StartInclusion {
                file,
                directive,
                included,
                path,
            } => log.start_inclusion(*file, *directive, *included, path),
            LogEntry::EndInclusion { included, offset } => log.end_inclusion(*included, *offset),
            LogEntry::StartExpansion {
                name,
                file,
                invocation,
                function_style,
            } => {
                if *function_style {
                    log.start_function_style_expansion(*name, *file, *invocation);
                } else {
                    log.start_object_style_expansion(*name, *file, *invocation);
                }
            }
            LogEntry::EndExpansion {
                name,
                file,
                invocation,
                function_style,
            } => {
                if *function_style {
                    log.end_function_style_expansion(*name, *file, *invocation);
                } else {
                    log.end_object_style_expansion(*name, *file, *invocation);
                }
            }
            LogEntry::Define(def) => {
                if def.is_function_like() {
                    log.define_function_style_macro(def);
                } else {
                    log.define_object_style_macro(def);
                }
            }
            LogEntry::Undef {
                file,
                directive,
                name,
                was_defined,
            } => log.encounter_pound_undef(*file, *directive, *name, *was_defined),
            LogEntry::Conditional {
                kind,
                file,
                directive,
                taken,
            } => match *kind {
                ConditionalKind::If => log.encounter_pound_if(*file, *directive, *taken),
                ConditionalKind::Ifdef(name) => {
                    log.encounter_pound_ifdef(*file, *directive, name, *taken);
                }
                ConditionalKind::Ifndef(name) => {
                    log.encounter_pound_ifndef(*file, *directive, name, *taken);
                }
                ConditionalKind::Elif => log.encounter_pound_elif(*file, *directive, *taken),
                ConditionalKind::Else => log.encounter_pound_else(*file, *directive, *taken),
                ConditionalKind::Endif => log.encounter_pound_endif(*file, *directive),
            },
            LogEntry::Directive {
                kind,
                file,
                directive,
            } => match kind {
                DirectiveKind::Pragma => log.encounter_pound_pragma(*file, *directive),
                DirectiveKind::Error => log.encounter_pound_error(*file, *directive),
                DirectiveKind::Warning => log.encounter_pound_warning(*file, *directive),
                DirectiveKind::Line => log.encounter_pound_line(*file, *directive),
            },
            LogEntry::Include {
                file,
                directive,
                header,
                system,
                resolved,
            } => log.encounter_pound_include(
                *file,
                *directive,
                header,
                *system,
                resolved.as_deref(),
            ),
            LogEntry::Problem(problem) => log.encounter_problem(problem),
        }
    }

    /// File and span in unexpanded source, when the event has one.
    pub fn location(&self) -> Option<(FileId, Span)> {
        match self {
            LogEntry::StartInclusion {
                file, directive, ..
            }
            | LogEntry::Undef {
                file, directive, ..
            }
            | LogEntry::Conditional {
                file, directive, ..
            }
            | LogEntry::Directive {
                file, directive, ..
            }
            | LogEntry::Include {
                file, directive, ..
            } => Some((*file, *directive)),
            LogEntry::StartExpansion {
                file, invocation, ..
            }
            | LogEntry::EndExpansion {
                file, invocation, ..
            } => Some((*file, *invocation)),
            LogEntry::Define(def) => Some((def.file, def.span)),
            LogEntry::Problem(problem) => problem
                .primary_span()
                .map(|span| (problem.primary_file(), span)),
            LogEntry::StartTranslationUnit { .. }
            | LogEntry::EndTranslationUnit { .. }
            | LogEntry::EndInclusion { .. } => None,
        }
    }
}
