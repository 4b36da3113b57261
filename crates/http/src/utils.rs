/// Returns early with `$error` unless `$predicate` holds.
///
/// ```ignore
/// ensure!(first & FIN_BIT != 0, FrameError::UnsupportedFragmentation);
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
