use std::io::{self, Write};

use flexi_logger::{DeferredNow, Record, style};

/// `HH:MM:SS LEVEL target: message`, level colored when the terminal allows.
pub fn cli_format(w: &mut dyn Write, now: &mut DeferredNow, record: &Record) -> io::Result<()> {
    let level = record.level();
    write!(
        w,
        "{} {} {}: {}",
        now.format("%H:%M:%S"),
        style(level).paint(format!("{level:5}")),
        record.target(),
        record.args()
    )
}
