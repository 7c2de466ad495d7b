/// Character-level view of the input handed to an [`ExternalScanner`].
pub trait ScanCursor {
    /// The current character, or `'\0'` at the end of input. Invalid UTF-8
    /// bytes are reported as `U+FFFD`.
    fn lookahead(&self) -> char;

    /// Moves past the current character. Skipped characters become padding
    /// instead of token text.
    fn advance(&mut self, skip: bool);

    /// Marks the current position as the end of the token. Without a mark the
    /// token ends wherever scanning stopped.
    fn mark_end(&mut self);

    /// Zero-based column of the current position in bytes.
    fn column(&self) -> u32;

    fn is_eof(&self) -> bool;
}

/// Hand-written lexing logic for tokens a regular lexer cannot describe, such
/// as heredocs or raw strings with a variable delimiter.
///
/// A scanner is stateful. Its state is snapshotted after every external token
/// with [`serialize`](Self::serialize) and restored before every scan with
/// [`deserialize`](Self::deserialize), so the parser can resume lexing at any
/// earlier token.
pub trait ExternalScanner: Send {
    /// Tries to recognise one external token. `valid` is indexed by external
    /// token and tells which of them the parser accepts here. Returns the
    /// external token index on success.
    fn scan(&mut self, cursor: &mut dyn ScanCursor, valid: &[bool]) -> Option<usize>;

    fn serialize(&self, buffer: &mut Vec<u8>);

    /// Restores a snapshot. An empty slice means the initial state.
    fn deserialize(&mut self, state: &[u8]);
}

pub type ScannerFactory = fn() -> Box<dyn ExternalScanner>;
