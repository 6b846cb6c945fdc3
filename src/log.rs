use std::{cell::RefCell, fmt::Write, io, rc::Rc, sync::Mutex};

use lazy_static::lazy_static;

pub struct StringBuffer {
    s: String,
}

impl StringBuffer {
    pub fn new() -> StringBuffer {
        StringBuffer { s: String::new() }
    }

    pub fn as_str(&self) -> &str {
        self.s.as_str()
    }

    pub fn clear(&mut self) {
        self.s = String::new();
    }
}

// String only implements fmt::Write
impl io::Write for StringBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let str_rep = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let res = self.s.write_str(str_rep);
        match res {
            Ok(_) => Ok(buf.len()),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// For convenience, so we can pass around a shared stream writer.
//
// Used to capture errors and notices of interest to users, so they can
// be presented either on stderr, or buffered to show elsewhere.
pub struct WriteHandle {
    w: Rc<RefCell<dyn io::Write>>,
}

impl Clone for WriteHandle {
    fn clone(&self) -> Self {
        WriteHandle { w: self.w.clone() }
    }
}

impl WriteHandle {
    pub fn stderr_write_handle() -> WriteHandle {
        WriteHandle {
            w: Rc::new(RefCell::new(io::stderr())),
        }
    }

    pub fn stdout_write_handle() -> WriteHandle {
        WriteHandle {
            w: Rc::new(RefCell::new(io::stdout())),
        }
    }

    pub fn string_buff_write_handle() -> (WriteHandle, Rc<RefCell<StringBuffer>>) {
        let buffer = Rc::new(RefCell::new(StringBuffer::new()));
        let h = WriteHandle { w: buffer.clone() };
        (h, buffer)
    }

    pub fn empty_write_handle() -> WriteHandle {
        let (h, _) = Self::string_buff_write_handle();
        h
    }
}

impl io::Write for WriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.w.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.borrow_mut().flush()
    }
}

#[macro_export]
macro_rules! write_errln {
    ($handle:expr, $($arg:tt)*) => {{
        use std::io::Write;
        let _ = writeln!($handle, $($arg)*);
    }};
}

lazy_static! {
    static ref VERBOSE: Mutex<bool> = Mutex::new(false);
}

pub fn set_verbose(verb: bool) {
    let mut var = VERBOSE.lock().unwrap();
    *var = verb;
}

pub fn get_verbose() -> bool {
    VERBOSE.lock().unwrap().clone()
}

// tt - TokenTree
// ($($arg:tt)*) Variable number of tts
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {{
        if $crate::log::get_verbose() {
            print!($($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! verboseln {
    ($($arg:tt)*) => {{
        if $crate::log::get_verbose() {
            println!($($arg)*);
        }
    }};
}
