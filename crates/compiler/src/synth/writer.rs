/// Line buffer with tab indentation.
#[derive(Debug, Default)]
pub(crate) struct CodeWriter {
	code: String,
	indent: usize,
}

impl CodeWriter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Writes `text` at the current indentation. Embedded newlines are indented line by line.
	pub fn line(&mut self, text: &str) {
		for line in text.split('\n') {
			if !line.is_empty() {
				for _ in 0..self.indent {
					self.code.push('\t');
				}
				self.code.push_str(line);
			}
			self.code.push('\n');
		}
	}

	pub fn blank(&mut self) {
		self.code.push('\n');
	}

	/// Writes `text` and indents what follows.
	pub fn open(&mut self, text: &str) {
		self.line(text);
		self.indent += 1;
	}

	/// Dedents and writes `text`.
	pub fn close(&mut self, text: &str) {
		self.indent = self.indent.saturating_sub(1);
		self.line(text);
	}

	pub fn dedent(&mut self) {
		self.indent = self.indent.saturating_sub(1);
	}

	/// Dedents, writes `text` and indents again, as for `} else {`.
	pub fn reopen(&mut self, text: &str) {
		self.indent = self.indent.saturating_sub(1);
		self.line(text);
		self.indent += 1;
	}

	pub fn depth(&self) -> usize {
		self.indent
	}

	pub fn finish(self) -> String {
		self.code
	}
}
