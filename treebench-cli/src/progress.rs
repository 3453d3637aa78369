// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Human-readable sweep progress on stdout.

use std::io::Write;

use treebench_core::{InputSize, Measurement, MatrixCell, ResultSet, SweepObserver, Task};

/// Prints a header per task, a line per size and a `.` per replicate.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    line_open: bool,
}

impl ConsoleProgress {
    /// Terminate the current size line, if any.
    pub fn finish_line(&mut self) {
        if self.line_open {
            println!();
            self.line_open = false;
        }
    }
}

impl SweepObserver for ConsoleProgress {
    fn task_started(&mut self, task: Task) {
        self.finish_line();
        println!("=== Running task: {} ===", task);
    }

    fn size_started(&mut self, _task: Task, size: InputSize) {
        self.finish_line();
        print!("- X = {} leaves.", size);
        self.line_open = true;
    }

    fn cell_started(&mut self, cell: &MatrixCell) {
        print!(" {}", cell.library);
        let _ = std::io::stdout().flush();
    }

    fn replicate_finished(&mut self, _cell: &MatrixCell, _replicate: u32, _measurement: &Measurement) {
        print!(".");
        let _ = std::io::stdout().flush();
    }

    fn sweep_finished(&mut self, _results: &ResultSet) {
        self.finish_line();
    }
}
