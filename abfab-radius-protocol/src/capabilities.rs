use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Optional ABFAB behaviour a RADIUS server takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ServerCapabilities: u8 {
        /// The server expects GSS acceptor identity attributes in each Access-Request.
        const GSS_ACCEPTOR = 0b00000001;

        /// The server may attach a SAML assertion to an Access-Accept.
        const SAML_ASSERTION = 0b00000010;
    }
}

impl fmt::Display for ServerCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let mut name_iter = self.iter_names();

        while let Some((name, _)) = name_iter.next() {
            // no trailing separator
            if name_iter.remaining().is_empty() {
                write!(f, "{name}")?;
            } else {
                write!(f, "{name}|")?;
            }
        }

        Ok(())
    }
}
