//! One module per NFSv3 procedure this client issues. Each defines the
//! argument and result structures and a `…Result` alias whose failure
//! arm carries the `nfsstat3` value plus the failure body.

macro_rules! pub_use {
    ($($name:ident),+) => { $(mod $name; pub use $name::*;)+ }
}

pub_use!(lookup, setattr, readlink, read, write, create);
pub_use!(mkdir, mknod, remove, rmdir, rename, link);
pub_use!(readdir, fsstat, fsinfo, commit);
