use super::arena::{Arena, Frame, VariableFrame};
use super::expr::{evaluate, Context, Lookup, Mode};
use super::statement::Statement;
use super::{Config, Host, Var};
use super::{AUTORUN_DELAY, DELAY_TIMER, FILE_HANDLES, INDEX_ENTRY_LEN, MAX_TIMERS};
use crate::error;
use crate::lang::{listing, Cursor, Error, Line, LineNumber, Token, MAX_LINE_NUMBER, NL};
use crate::store::{item_len, special, Flash, FlashStore, MAX_ITEM_LEN};

type Result<T> = std::result::Result<T, Error>;

/// Where execution continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pc {
    /// The line typed at the prompt.
    Direct,
    /// Position in the line index.
    Line(usize),
    End,
}

/// Why the runtime handed control back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting for the next line or event.
    Ready,
    /// REBOOT was executed.
    Terminate,
    OutOfMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Jump(Pc),
    Yield(Status),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct File {
    name: u8,
    record: u16,
    writing: bool,
}

/// ## The interpreter
///
/// Owns the flash store, the arena and the variables. Lines typed at the
/// prompt go through `enter`, host timers and interrupts come back through
/// `event`. Nothing runs between calls.
pub struct Runtime<F: Flash, H: Host> {
    store: FlashStore<F>,
    host: H,
    arena: Arena,
    var: Var,
    files: [Option<File>; FILE_HANDLES],
    direct: Vec<u8>,
}

/// Expression access to variables and the host for the duration of one
/// evaluation.
struct Scope<'a, H> {
    var: &'a Var,
    arena: &'a Arena,
    host: &'a mut H,
}

impl<'a, H: Host> Context for Scope<'a, H> {
    fn lookup(&self, name: u8) -> Lookup<'_> {
        self.var.lookup(name, self.arena)
    }
    fn millis(&mut self) -> i32 {
        self.host.millis()
    }
    fn random(&mut self) -> i32 {
        self.host.random()
    }
    fn battery(&mut self) -> i32 {
        self.host.battery()
    }
    fn pin_read(&mut self, major: u8, minor: u8) -> Option<i32> {
        if minor >= 8 {
            return None;
        }
        self.host.pin_read(major, minor)
    }
    fn ble_param(&mut self, param: u16) -> Option<i32> {
        self.host.ble_param(param)
    }
}

impl<F: Flash, H: Host> Runtime<F, H> {
    pub fn new(config: Config, flash: F, host: H) -> Runtime<F, H> {
        let mut runtime = Runtime {
            store: FlashStore::new(flash, config.page_size),
            host,
            arena: Arena::new(config.arena_size),
            var: Var::new(),
            files: [None; FILE_HANDLES],
            direct: vec![],
        };
        runtime.reset();
        runtime
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &FlashStore<F> {
        &self.store
    }

    /// Gives back the flash, as a power cycle would leave it.
    pub fn into_flash(self) -> F {
        self.store.into_flash()
    }

    /// Boot banner. Schedules the stored program when autorun is set.
    pub fn setup(&mut self) {
        self.host
            .print(&format!("BlueBasic {}\n", env!("CARGO_PKG_VERSION")));
        self.mem();
        if self.store.find_special(special::AUTORUN).is_some() {
            if let Some(first) = self.store.line_number(0) {
                self.host
                    .timer_start(DELAY_TIMER, AUTORUN_DELAY, false, first);
            }
        }
    }

    /// Stack, heap and variables are all cleared. Open files are
    /// forgotten and registered services torn down.
    pub fn reset(&mut self) {
        for service in self.arena.reset() {
            self.host.service_teardown(service);
        }
        self.var.clear();
        self.files = [None; FILE_HANDLES];
        self.arena.set_floor(self.store.len() * INDEX_ENTRY_LEN);
    }

    /// Records a resource living on the heap until the next reset.
    pub fn register_service(&mut self, service: u16) -> Result<()> {
        self.arena.add_service(service)
    }

    /// Asks for `Host::notify` whenever an element of array `name` is set.
    pub fn attach_notifier(&mut self, name: u8, notifier: u16) -> Result<()> {
        match self.arena.variable_mut(name) {
            Some(var) => {
                var.notifier = Some(notifier);
                Ok(())
            }
            None => Err(error!(General)),
        }
    }

    /// One line from the terminal. A numbered line edits the program,
    /// anything else runs at once.
    pub fn enter(&mut self, s: &str) -> Status {
        let line = match Line::new(s) {
            Ok(line) => line,
            Err(error) => return self.fail(Pc::End, error),
        };
        if !line.is_direct() {
            return self.edit(&line);
        }
        if line.is_empty() {
            return Status::Ready;
        }
        self.direct = line.text().to_vec();
        self.interpret(Pc::Direct)
    }

    /// Runs from `line` on behalf of a timer or interrupt. With
    /// `can_return` the handler may end with RETURN.
    pub fn event(&mut self, line: LineNumber, can_return: bool) -> Status {
        let pos = match self.store.find(line) {
            Some(pos) => pos,
            None => return Status::Ready,
        };
        if can_return {
            if let Err(error) = self.arena.push(Frame::Event) {
                return self.fail(Pc::End, error);
            }
        }
        self.interpret(Pc::Line(pos))
    }

    fn edit(&mut self, line: &Line) -> Status {
        self.reset();
        let number = line.number();
        if line.is_empty() {
            self.store.delete_line(number);
            self.arena.set_floor(self.store.len() * INDEX_ENTRY_LEN);
            return Status::Ready;
        }
        let len = item_len(line.text().len());
        if len > MAX_ITEM_LEN {
            return self.fail(Pc::End, error!(TooBig));
        }
        let entries = self.store.len() + self.store.find(number).map_or(1, |_| 0);
        if !self.arena.floor_fits(entries * INDEX_ENTRY_LEN) {
            return self.fail(Pc::End, error!(OutOfMemory));
        }
        if self.store.add_line(number, line.text()).is_none() {
            let stored = self.store.compact(len, self.arena.scratch())
                && self.store.add_line(number, line.text()).is_some();
            if !stored {
                return self.fail(Pc::End, error!(OutOfMemory));
            }
        }
        self.arena.set_floor(self.store.len() * INDEX_ENTRY_LEN);
        Status::Ready
    }

    fn fail(&mut self, pc: Pc, error: Error) -> Status {
        let source = match pc {
            Pc::Line(pos) => self
                .store
                .line(pos)
                .map(|(number, text)| Line::from_stored(number, text).to_string()),
            _ => None,
        };
        self.host.report(&error, source.as_deref());
        if error.is_out_of_memory() {
            Status::OutOfMemory
        } else {
            Status::Ready
        }
    }

    fn interpret(&mut self, mut pc: Pc) -> Status {
        loop {
            let text = match pc {
                Pc::Direct => self.direct.clone(),
                Pc::Line(pos) => match self.store.line(pos) {
                    Some((_, text)) => text.to_vec(),
                    None => Vec::new(),
                },
                Pc::End => {
                    self.host.print("OK\n");
                    return Status::Ready;
                }
            };
            if self.host.break_check() {
                return self.fail(pc, error!(Break));
            }
            match self.execute(pc, &text) {
                Ok(Flow::Next) => pc = self.next(pc),
                Ok(Flow::Jump(to)) => pc = to,
                Ok(Flow::Yield(status)) => return status,
                Err(error) => return self.fail(pc, error),
            }
        }
    }

    fn execute(&mut self, pc: Pc, text: &[u8]) -> Result<Flow> {
        let mut cursor = Cursor::new(text);
        let c = &mut cursor;
        let statement = Statement::decode(c)?;
        if pc == Pc::Direct && statement.is_program_only() {
            return Err(error!(Direct));
        }
        match statement {
            Statement::List => self.list(c),
            Statement::New => {
                c.expect_eol()?;
                self.store.delete_all();
                self.reset();
                Ok(Flow::Jump(Pc::End))
            }
            Statement::Run => {
                c.expect_eol()?;
                self.reset();
                Ok(Flow::Jump(self.first()))
            }
            Statement::Mem => {
                c.expect_eol()?;
                self.mem();
                Ok(Flow::Next)
            }
            Statement::Rem => Ok(Flow::Next),
            Statement::Let => self.assign(c),
            Statement::If => self.branch(c, pc),
            Statement::Elif | Statement::Else => self.skip_to_end(pc),
            Statement::End => {
                c.expect_eol()?;
                Ok(Flow::Next)
            }
            Statement::Goto => {
                let target = self.eval(c, Mode::Normal)?;
                c.expect_eol()?;
                Ok(Flow::Jump(self.target(target)))
            }
            Statement::Gosub => {
                let target = self.eval(c, Mode::Normal)?;
                c.expect_eol()?;
                let resume = self.next(pc);
                self.arena.push(Frame::Gosub { resume })?;
                Ok(Flow::Jump(self.target(target)))
            }
            Statement::Return => {
                c.expect_eol()?;
                self.unwind()
            }
            Statement::For => self.start_loop(c, pc),
            Statement::Next => self.next_loop(c),
            Statement::Print => self.print(c),
            Statement::Dim => self.dim(c),
            Statement::Timer => self.timer(c),
            Statement::Delay => self.delay(c, pc),
            Statement::Autorun => {
                let on = self.eval(c, Mode::Normal)?;
                c.expect_eol()?;
                if on != 0 {
                    self.put_special(special::AUTORUN, &[])?;
                } else {
                    self.store.delete_special(special::AUTORUN);
                }
                Ok(Flow::Next)
            }
            Statement::Dsave => self.dsave(c),
            Statement::Dload => self.dload(c),
            Statement::Open => self.open(c),
            Statement::Close => {
                let handle = self.handle(c)?;
                c.expect_eol()?;
                self.files[handle] = None;
                Ok(Flow::Next)
            }
            Statement::Read => self.read(c),
            Statement::Write => self.write(c),
            Statement::Pin(major) => self.pin(c, major),
            Statement::Reboot => {
                c.expect_eol()?;
                self.host.reboot();
                Ok(Flow::Yield(Status::Terminate))
            }
        }
    }

    fn eval(&mut self, cursor: &mut Cursor, mode: Mode) -> Result<i32> {
        let mut scope = Scope {
            var: &self.var,
            arena: &self.arena,
            host: &mut self.host,
        };
        evaluate(cursor, mode, &mut scope)
    }

    fn after(&self, pos: usize) -> Pc {
        if pos + 1 < self.store.len() {
            Pc::Line(pos + 1)
        } else {
            Pc::End
        }
    }

    fn next(&self, pc: Pc) -> Pc {
        match pc {
            Pc::Line(pos) => self.after(pos),
            _ => Pc::End,
        }
    }

    fn first(&self) -> Pc {
        if self.store.is_empty() {
            Pc::End
        } else {
            Pc::Line(0)
        }
    }

    /// First stored line numbered `number` or above.
    fn target(&self, number: i32) -> Pc {
        let number = number.max(0).min(MAX_LINE_NUMBER as i32) as LineNumber;
        let pos = self.store.find_closest(number);
        if pos < self.store.len() {
            Pc::Line(pos)
        } else {
            Pc::End
        }
    }

    fn line_pos(pc: Pc) -> Result<usize> {
        match pc {
            Pc::Line(pos) => Ok(pos),
            _ => Err(error!(Direct)),
        }
    }

    fn mem(&mut self) {
        let msg = format!(
            "{} bytes free.\n{} bytes of flash free.\n",
            self.arena.free(),
            self.store.free_mem()
        );
        self.host.print(&msg);
    }

    fn list(&mut self, c: &mut Cursor) -> Result<Flow> {
        c.ignore_blanks();
        let from = if c.at_eol() {
            0
        } else {
            self.eval(c, Mode::Normal)?
        };
        c.expect_eol()?;
        let mut out = String::new();
        let mut depth: usize = 0;
        for pos in 0..self.store.len() {
            let (number, text) = match self.store.line(pos) {
                Some(line) => line,
                None => break,
            };
            let statement = Statement::decode(&mut Cursor::new(text)).ok();
            let (indent, after) = match statement {
                Some(Statement::If) | Some(Statement::For) => (depth, depth + 1),
                Some(Statement::Else) | Some(Statement::Elif) => {
                    (depth.saturating_sub(1), depth)
                }
                Some(Statement::End) | Some(Statement::Next) => {
                    let depth = depth.saturating_sub(1);
                    (depth, depth)
                }
                _ => (depth, depth),
            };
            depth = after;
            if (number as i32) < from {
                continue;
            }
            out.push_str(&format!(
                "{:>5} {}{}\n",
                number,
                "  ".repeat(indent),
                listing(text)
            ));
        }
        self.host.print(&out);
        Ok(Flow::Next)
    }

    fn assign(&mut self, c: &mut Cursor) -> Result<Flow> {
        let name = c.variable()?;
        let index = if c.accept(b'(') {
            Some(self.eval(c, Mode::Braces)?)
        } else {
            None
        };
        c.expect_token(Token::Eq)?;
        let value = self.eval(c, Mode::Normal)?;
        c.expect_eol()?;
        match index {
            None => {
                if self.var.is_shadowed(name) {
                    return Err(error!(General));
                }
                self.var.set(name, value);
            }
            Some(index) => self.store_element(name, index, value)?,
        }
        Ok(Flow::Next)
    }

    fn array(&self, name: u8) -> Option<VariableFrame> {
        if self.var.is_shadowed(name) {
            self.arena.variable(name).copied()
        } else {
            None
        }
    }

    fn store_element(&mut self, name: u8, index: i32, value: i32) -> Result<()> {
        let var = self.array(name).ok_or(error!(Expression))?;
        if index < 0 || index as usize >= var.block.len() {
            return Err(error!(Expression));
        }
        self.arena.bytes_mut(var.block)[index as usize] = value as u8;
        if let Some(notifier) = var.notifier {
            self.host.notify(notifier);
        }
        Ok(())
    }

    fn branch(&mut self, c: &mut Cursor, pc: Pc) -> Result<Flow> {
        let cond = self.eval(c, Mode::Normal)?;
        c.expect_eol()?;
        if cond != 0 {
            return Ok(Flow::Next);
        }
        let mut nest = 0;
        for pos in Self::line_pos(pc)? + 1..self.store.len() {
            let text = match self.store.line(pos) {
                Some((_, text)) => text.to_vec(),
                None => break,
            };
            let mut c = Cursor::new(&text);
            match Statement::decode(&mut c) {
                Ok(Statement::If) => nest += 1,
                Ok(Statement::End) if nest > 0 => nest -= 1,
                Ok(Statement::End) | Ok(Statement::Else) if nest == 0 => {
                    return Ok(Flow::Jump(self.after(pos)));
                }
                Ok(Statement::Elif) if nest == 0 => {
                    let cond = self.eval(&mut c, Mode::Normal)?;
                    c.expect_eol()?;
                    if cond != 0 {
                        return Ok(Flow::Jump(self.after(pos)));
                    }
                }
                _ => {}
            }
        }
        Ok(Flow::Jump(Pc::End))
    }

    /// A taken branch ran into ELSE or ELIF; continue after the END.
    fn skip_to_end(&mut self, pc: Pc) -> Result<Flow> {
        let mut nest = 0;
        for pos in Self::line_pos(pc)? + 1..self.store.len() {
            let statement = match self.store.line(pos) {
                Some((_, text)) => Statement::decode(&mut Cursor::new(text)),
                None => break,
            };
            match statement {
                Ok(Statement::If) => nest += 1,
                Ok(Statement::End) if nest > 0 => nest -= 1,
                Ok(Statement::End) => return Ok(Flow::Jump(self.after(pos))),
                _ => {}
            }
        }
        Ok(Flow::Jump(Pc::End))
    }

    fn unwind(&mut self) -> Result<Flow> {
        loop {
            match self.arena.pop() {
                None => return Ok(Flow::Jump(Pc::End)),
                Some(Frame::Variable(var)) => self.var.restore(var.name, var.prior),
                Some(Frame::Gosub { resume }) => return Ok(Flow::Jump(resume)),
                Some(Frame::Event) => return Ok(Flow::Yield(Status::Ready)),
                Some(Frame::For { .. }) => return Err(error!(OutOfMemory; "STACK")),
            }
        }
    }

    fn start_loop(&mut self, c: &mut Cursor, pc: Pc) -> Result<Flow> {
        let name = c.variable()?;
        c.expect_token(Token::Eq)?;
        let start = self.eval(c, Mode::Normal)?;
        c.expect_token(Token::To)?;
        let terminal = self.eval(c, Mode::Normal)?;
        let step = if c.accept_token(Token::Step) {
            self.eval(c, Mode::Normal)?
        } else {
            1
        };
        c.expect_eol()?;
        if self.var.is_shadowed(name) {
            return Err(error!(General));
        }
        self.var.set(name, start);
        self.arena.push(Frame::For {
            name,
            step,
            terminal,
            resume: self.next(pc),
        })?;
        Ok(Flow::Next)
    }

    /// Every frame above the matching FOR is dropped, GOSUB and EVENT
    /// frames included.
    fn next_loop(&mut self, c: &mut Cursor) -> Result<Flow> {
        let name = c.variable()?;
        c.expect_eol()?;
        let depth = self
            .arena
            .frames()
            .position(|frame| match frame {
                Frame::For { name: n, .. } => *n == name,
                _ => false,
            })
            .ok_or(error!(General))?;
        for _ in 0..depth {
            if let Some(Frame::Variable(var)) = self.arena.pop() {
                self.var.restore(var.name, var.prior);
            }
        }
        let (step, terminal, resume) = match self.arena.frames().next() {
            Some(&Frame::For {
                step,
                terminal,
                resume,
                ..
            }) => (step, terminal, resume),
            _ => return Err(error!(General)),
        };
        let value = self.var.get(name).wrapping_add(step);
        self.var.set(name, value);
        if (step > 0 && value <= terminal) || (step < 0 && value >= terminal) {
            Ok(Flow::Jump(resume))
        } else {
            self.arena.pop();
            Ok(Flow::Next)
        }
    }

    fn print(&mut self, c: &mut Cursor) -> Result<Flow> {
        let mut out = String::new();
        loop {
            let ch = c.peek();
            match ch {
                NL => break,
                b'"' | b'\'' => {
                    c.advance();
                    loop {
                        let next = c.next();
                        if next == ch {
                            break;
                        }
                        if next == NL {
                            return Err(error!(General));
                        }
                        out.push(next as char);
                    }
                }
                b',' | b' ' => c.advance(),
                _ => {
                    let val = self.eval(c, Mode::Comma)?;
                    out.push_str(&val.to_string());
                }
            }
        }
        out.push('\n');
        self.host.print(&out);
        Ok(Flow::Next)
    }

    fn dim(&mut self, c: &mut Cursor) -> Result<Flow> {
        let name = c.variable()?;
        c.expect(b'(')?;
        let size = self.eval(c, Mode::Braces)?;
        c.expect_eol()?;
        if size < 0 {
            return Err(error!(General));
        }
        let block = self.arena.alloc(size as usize)?;
        let frame = VariableFrame {
            name,
            block,
            prior: self.var.is_shadowed(name),
            notifier: None,
        };
        if let Err(error) = self.arena.push(Frame::Variable(frame)) {
            self.arena.release(block);
            return Err(error);
        }
        self.var.shadow(name);
        Ok(Flow::Next)
    }

    fn timer(&mut self, c: &mut Cursor) -> Result<Flow> {
        let id = self.eval(c, Mode::Comma)?;
        if c.accept_token(Token::Stop) {
            c.expect_eol()?;
            if !(0..MAX_TIMERS as i32).contains(&id) {
                return Err(error!(General));
            }
            self.host.timer_stop(id as u8);
            return Ok(Flow::Next);
        }
        if !(0..DELAY_TIMER as i32).contains(&id) {
            return Err(error!(General));
        }
        let timeout = self.eval(c, Mode::Normal)?;
        let repeat = c.accept_token(Token::Repeat);
        c.expect_token(Token::Gosub)?;
        let line = self.eval(c, Mode::Normal)?;
        c.expect_eol()?;
        if line < 1 || line > MAX_LINE_NUMBER as i32 {
            return Err(error!(General));
        }
        if !self
            .host
            .timer_start(id as u8, timeout, repeat, line as LineNumber)
        {
            return Err(error!(General));
        }
        Ok(Flow::Next)
    }

    fn delay(&mut self, c: &mut Cursor, pc: Pc) -> Result<Flow> {
        let timeout = self.eval(c, Mode::Normal)?;
        c.expect_eol()?;
        if timeout < 0 {
            return Err(error!(General));
        }
        if let Pc::Line(pos) = self.next(pc) {
            if let Some(line) = self.store.line_number(pos) {
                self.host.timer_start(DELAY_TIMER, timeout, false, line);
            }
        }
        Ok(Flow::Yield(Status::Ready))
    }

    /// Writes a special record, compacting once if flash is full.
    fn put_special(&mut self, key: u32, data: &[u8]) -> Result<()> {
        let len = item_len(data.len() + 4);
        if len > MAX_ITEM_LEN {
            return Err(error!(TooBig));
        }
        if self.store.add_special(key, data) {
            return Ok(());
        }
        if self.store.compact(len, self.arena.scratch()) && self.store.add_special(key, data) {
            Ok(())
        } else {
            Err(error!(OutOfMemory))
        }
    }

    fn bytes_of(&self, name: u8) -> Vec<u8> {
        match self.var.lookup(name, &self.arena) {
            Lookup::Scalar(val) => val.to_le_bytes().to_vec(),
            Lookup::Array(bytes) => bytes.to_vec(),
        }
    }

    /// Fills variable `name` from `data`. Returns the bytes used.
    fn load_into(&mut self, name: u8, data: &[u8]) -> usize {
        match self.array(name) {
            Some(var) => {
                let len = var.block.len().min(data.len());
                self.arena.bytes_mut(var.block)[..len].copy_from_slice(&data[..len]);
                if let Some(notifier) = var.notifier {
                    self.host.notify(notifier);
                }
                len
            }
            None => {
                let mut word = [0u8; 4];
                let len = data.len().min(4);
                word[..len].copy_from_slice(&data[..len]);
                self.var.set(name, i32::from_le_bytes(word));
                len
            }
        }
    }

    fn setting(&mut self, c: &mut Cursor) -> Result<(u32, u8)> {
        let n = self.eval(c, Mode::Comma)?;
        let name = c.variable()?;
        c.expect_eol()?;
        if !(1..=255).contains(&n) {
            return Err(error!(General));
        }
        Ok((special::setting(n as u8), name))
    }

    fn dsave(&mut self, c: &mut Cursor) -> Result<Flow> {
        let (key, name) = self.setting(c)?;
        let data = self.bytes_of(name);
        self.put_special(key, &data)?;
        Ok(Flow::Next)
    }

    fn dload(&mut self, c: &mut Cursor) -> Result<Flow> {
        let (key, name) = self.setting(c)?;
        let data = match self.store.find_special(key) {
            Some(data) => data.to_vec(),
            None => return Err(error!(EndOfFile)),
        };
        self.load_into(name, &data);
        Ok(Flow::Next)
    }

    /// `#h` followed by an optional comma.
    fn handle(&mut self, c: &mut Cursor) -> Result<usize> {
        c.expect(b'#')?;
        let handle = self.eval(c, Mode::Comma)?;
        if !(0..FILE_HANDLES as i32).contains(&handle) {
            return Err(error!(General));
        }
        Ok(handle as usize)
    }

    fn open_file(&self, handle: usize, writing: bool) -> Result<File> {
        match self.files[handle] {
            Some(file) if file.writing == writing => Ok(file),
            _ => Err(error!(General)),
        }
    }

    fn open(&mut self, c: &mut Cursor) -> Result<Flow> {
        let handle = self.eval(c, Mode::Comma)?;
        if !(0..FILE_HANDLES as i32).contains(&handle) {
            return Err(error!(General));
        }
        let mode = if c.accept_token(Token::Read) {
            Token::Read
        } else if c.accept_token(Token::Write) {
            Token::Write
        } else if c.accept_token(Token::Append) {
            Token::Append
        } else {
            return Err(error!(General));
        };
        c.expect(b'"')?;
        let name = c.next().to_ascii_uppercase();
        if !name.is_ascii_uppercase() {
            return Err(error!(General));
        }
        c.expect(b'"')?;
        c.expect_eol()?;
        let mut record = 1;
        match mode {
            Token::Write => {
                while self.store.delete_special(special::file(name, record)) {
                    record += 1;
                }
                record = 1;
            }
            Token::Append => {
                while self.store.find_special(special::file(name, record)).is_some() {
                    record += 1;
                }
            }
            _ => {}
        }
        self.files[handle as usize] = Some(File {
            name,
            record,
            writing: mode != Token::Read,
        });
        Ok(Flow::Next)
    }

    fn read(&mut self, c: &mut Cursor) -> Result<Flow> {
        let handle = self.handle(c)?;
        let file = self.open_file(handle, false)?;
        let data = match self.store.find_special(special::file(file.name, file.record)) {
            Some(data) => data.to_vec(),
            None => return Err(error!(EndOfFile)),
        };
        let mut names = vec![c.variable()?];
        while c.accept(b',') {
            names.push(c.variable()?);
        }
        c.expect_eol()?;
        let mut offset = 0;
        for name in names {
            offset += self.load_into(name, &data[offset..]);
        }
        self.files[handle] = Some(File {
            record: file.record + 1,
            ..file
        });
        Ok(Flow::Next)
    }

    fn write(&mut self, c: &mut Cursor) -> Result<Flow> {
        let handle = self.handle(c)?;
        let file = self.open_file(handle, true)?;
        let mut data = vec![];
        loop {
            c.ignore_blanks();
            let ch = c.peek();
            let mut look = c.clone();
            look.advance();
            look.ignore_blanks();
            let alone = look.peek() == b',' || look.at_eol();
            let array = if ch.is_ascii_uppercase() && alone {
                self.array(ch)
            } else {
                None
            };
            match array {
                Some(var) => {
                    data.extend_from_slice(self.arena.bytes(var.block));
                    c.advance();
                    c.accept(b',');
                }
                _ => {
                    let val = self.eval(c, Mode::Comma)?;
                    data.extend_from_slice(&val.to_le_bytes());
                }
            }
            c.ignore_blanks();
            if c.at_eol() {
                break;
            }
        }
        if item_len(data.len() + 4) > MAX_ITEM_LEN {
            return Err(error!(TooBig));
        }
        self.put_special(special::file(file.name, file.record), &data)?;
        self.files[handle] = Some(File {
            record: file.record + 1,
            ..file
        });
        Ok(Flow::Next)
    }

    fn pin(&mut self, c: &mut Cursor, major: u8) -> Result<Flow> {
        let minor = self.eval(c, Mode::Braces)?;
        c.expect_token(Token::Eq)?;
        let value = self.eval(c, Mode::Normal)?;
        c.expect_eol()?;
        if !(0..8).contains(&minor) {
            return Err(error!(BadPin));
        }
        if !self.host.pin_write(major, minor as u8, value != 0) {
            return Err(error!(BadPin));
        }
        Ok(Flow::Next)
    }
}
