//! Error type shared by the whole crate, plus the fixed status-to-text
//! tables for NFSv3 and MOUNTv3 protocol errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Reply ended before the structure we were decoding did.
    #[error("short packet while decoding reply")]
    Truncated,

    /// A union discriminant or enum value outside the RFC-defined set.
    #[error("invalid {what} value {value} in reply")]
    BadDiscriminant { what: &'static str, value: u32 },

    /// Reply violates the protocol in some other structural way.
    #[error("{0}")]
    Decode(&'static str),

    #[error("call timed out")]
    Timeout,

    /// The server rejected or failed the RPC itself (not the program).
    #[error("rpc: {0}")]
    Rpc(String),

    #[error("{}", nfs_error_str(*.0))]
    Nfs(u32),

    #[error("{}", mount_error_str(*.0))]
    Mount(u32),

    /// Attribute-bearing reply came back without attributes.
    #[error("server omitted attributes from a successful reply")]
    MissingAttributes,

    #[error("portmap: program not registered")]
    NotRegistered,

    #[error("{0}: unknown host")]
    UnknownHost(String),

    #[error("privileged socket: all ports in use")]
    PortsExhausted,

    #[error("no secure nfs support")]
    NoSecureNfs,

    #[error("no host specified")]
    NoHost,

    #[error("no remote file system mounted")]
    NotMounted,

    #[error("no root handle available")]
    NoRootHandle,

    #[error("{name}: is not a directory")]
    NotDirectory { name: String },

    #[error("{name}: is not a regular file")]
    NotRegular { name: String },

    /// Wraps another error with the path component or file it concerns.
    #[error("{name}: {source}")]
    Named {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn named(name: impl Into<String>, source: Error) -> Error {
        Error::Named {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

/// RFC 1813 `nfsstat3` rendered the way the historical tools spell them.
pub fn nfs_error_str(status: u32) -> &'static str {
    use crate::nfs3::*;
    match status {
        NFS3_OK => "No error",
        NFS3ERR_PERM => "Not owner",
        NFS3ERR_NOENT => "No such file or directory",
        NFS3ERR_IO => "I/O error",
        NFS3ERR_NXIO => "No such device or address",
        NFS3ERR_ACCES => "Permission denied",
        NFS3ERR_EXIST => "File exists",
        NFS3ERR_XDEV => "Cross-device link",
        NFS3ERR_NODEV => "No such device",
        NFS3ERR_NOTDIR => "Not a directory",
        NFS3ERR_ISDIR => "Is a directory",
        NFS3ERR_INVAL => "Invalid argument",
        NFS3ERR_FBIG => "File too large",
        NFS3ERR_NOSPC => "No space left on device",
        NFS3ERR_ROFS => "Read-only file system",
        NFS3ERR_MLINK => "Too many hard links",
        NFS3ERR_NAMETOOLONG => "File name too long",
        NFS3ERR_NOTEMPTY => "Directory not empty",
        NFS3ERR_DQUOT => "Disc quota exceeded",
        NFS3ERR_STALE => "Stale NFS file handle",
        NFS3ERR_REMOTE => "Too many levels of remote in path",
        NFS3ERR_BADHANDLE => "Illegal NFS file handle",
        NFS3ERR_NOT_SYNC => "Update synchronization mismatch",
        NFS3ERR_BAD_COOKIE => "READDIR or READDIRPLUS cookie is stale",
        NFS3ERR_NOTSUPP => "Operation is not supported",
        NFS3ERR_TOOSMALL => "Buffer or request is too small",
        NFS3ERR_SERVERFAULT => "Other server error",
        NFS3ERR_BADTYPE => "Type not supported by server",
        NFS3ERR_JUKEBOX => "Retrieval pending",
        _ => "UNKNOWN NFS ERROR",
    }
}

/// MOUNTv3 status values share numbering with `nfsstat3` where they overlap.
pub fn mount_error_str(status: u32) -> &'static str {
    nfs_error_str(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_table_covers_known_and_unknown() {
        assert_eq!(nfs_error_str(2), "No such file or directory");
        assert_eq!(nfs_error_str(10008), "Retrieval pending");
        assert_eq!(nfs_error_str(424242), "UNKNOWN NFS ERROR");
    }

    #[test]
    fn named_error_renders_component_first() {
        let e = Error::named("passwd", Error::Nfs(crate::nfs3::NFS3ERR_ACCES));
        assert_eq!(e.to_string(), "passwd: Permission denied");
    }
}
