//! Terminal size detection

use std::io;
use std::os::fd::AsRawFd;

use nstree_namespace::RenderOptions;

nix::ioctl_read_bad!(tiocgwinsz, libc::TIOCGWINSZ, libc::winsize);

/// Width of the terminal on stdout, or the default width when stdout is
/// not a terminal
pub fn width() -> usize {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: `size` is a valid winsize for the kernel to fill in.
    match unsafe { tiocgwinsz(io::stdout().as_raw_fd(), &mut size) } {
        Ok(_) if size.ws_col > 0 => usize::from(size.ws_col),
        Ok(_) => RenderOptions::DEFAULT_WIDTH,
        Err(e) => {
            tracing::debug!(error = %e, "stdout is not a terminal, using default width");
            RenderOptions::DEFAULT_WIDTH
        }
    }
}
