/// Actions that the TUI can process, mapped from keyboard input or internal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NavigateBack,
    DrillIn,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoTop,
    GoBottom,
    ToggleHelp,
    /// Open the query prompt.
    EditQuery,
    /// Re-run the last submitted query.
    Retry,
    CancelSearch,
    Export(papertree_reporting::ExportFormat),
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    Tick,
    Resize(u16, u16),
    None,
}
