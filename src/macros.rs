#[macro_export]
macro_rules! require {
    ($e:expr, $err:expr) => {
        if !$e {
            return Err($err)
        }
    };
}

#[macro_export]
macro_rules! slice {
    ($s:expr, $range:expr) => {
        match $s.get($range) {
            Some(v) => v,
            None => return Err($crate::FontError::UnexpectedEof)
        }
    };
}

#[macro_export]
macro_rules! offset {
    ($s:expr, $start:expr) => (slice!($s, $start as usize ..))
}
