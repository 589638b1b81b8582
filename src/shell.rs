//! The interactive command loop: one line in, one command out.
//! Tokenisation is whitespace-only (no quoting), dispatch goes through
//! a fixed keyword table, `!` escapes to the local shell, and SIGINT
//! abandons the running command and returns to the prompt.

use crate::glob;
use crate::net::Proto;
use crate::nfs3::procs::{DeviceData3, MknodData3};
use crate::nfs3::{FileType3, NfsFh3, SetAttributes, NFS3_FHSIZE};
use crate::result::Error;
use crate::session::{AuthFlavor, MountOpts, Session, NOBODY};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmd {
    Host,
    Uid,
    Gid,
    Cd,
    Lcd,
    Cat,
    Ls,
    Get,
    Df,
    Rm,
    Ln,
    Mv,
    Mkdir,
    Rmdir,
    Chmod,
    Chown,
    Put,
    Mount,
    Umount,
    Umountall,
    Export,
    Dump,
    Status,
    Help,
    Quit,
    Handle,
    Mknod,
}

const KEYWORDS: &[(&str, Cmd, &str)] = &[
    ("host", Cmd::Host, "<host> - set remote host name"),
    ("uid", Cmd::Uid, "[<uid> [<secret-key>]] - set remote user id"),
    ("gid", Cmd::Gid, "[<gid>] - set remote group id"),
    ("cd", Cmd::Cd, "[<path>] - change remote working directory"),
    ("lcd", Cmd::Lcd, "[<path>] - change local working directory"),
    ("cat", Cmd::Cat, "<filespec> - display remote file"),
    ("ls", Cmd::Ls, "[-l] <filespec> - list remote directory"),
    ("get", Cmd::Get, "<filespec> - get remote files"),
    ("df", Cmd::Df, "- file system information"),
    ("rm", Cmd::Rm, "<file> - delete remote file"),
    ("ln", Cmd::Ln, "<file1> <file2> - link file"),
    ("mv", Cmd::Mv, "<file1> <file2> - move file"),
    ("mkdir", Cmd::Mkdir, "<dir> - make remote directory"),
    ("rmdir", Cmd::Rmdir, "<dir> - remove remote directory"),
    ("chmod", Cmd::Chmod, "<mode> <file> - change mode"),
    ("chown", Cmd::Chown, "<uid>[.<gid>] <file> - change owner"),
    ("put", Cmd::Put, "<local-file> [<remote-file>] - put file"),
    ("mount", Cmd::Mount, "[-upTU] [-P port] <path> - mount file system"),
    ("umount", Cmd::Umount, "- umount remote file system"),
    ("umountall", Cmd::Umountall, "- umount all remote file systems"),
    ("export", Cmd::Export, "- show all exported file systems"),
    ("dump", Cmd::Dump, "- show all remote mounted file systems"),
    ("status", Cmd::Status, "- general status report"),
    ("help", Cmd::Help, "- this help message"),
    ("quit", Cmd::Quit, "- its all in the name"),
    ("bye", Cmd::Quit, "- good bye"),
    ("handle", Cmd::Handle, "[<handle>] - get/set directory file handle"),
    ("mknod", Cmd::Mknod, "<name> [b/c major minor] [p] - make device"),
];

fn lookup_command(word: &str) -> Option<Cmd> {
    KEYWORDS
        .iter()
        .find(|(kw, _, _)| *kw == word)
        .map(|(_, cmd, _)| *cmd)
}

fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Bare `ls`/`get` behave like a shell expanding `*`: dotfiles only
/// show up when a pattern asks for them explicitly.
fn listed(name: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return !name.starts_with('.');
    }
    glob::matches_any(name, patterns)
}

/// Most failures are printed behind the action that failed; errors
/// that already name their subject stand on their own.
fn report(action: &str, err: &Error) {
    match err {
        Error::Named { .. } | Error::NotDirectory { .. } | Error::NotRegular { .. } => {
            eprintln!("{err}")
        }
        _ => eprintln!("{action}: {err}"),
    }
}

/// Parses the option block shared by `mount` and `handle`. Returns the
/// options and the remaining operands, or None on a bad flag.
fn parse_mount_opts<'a>(args: &'a [String], allow_mnt_flags: bool) -> Option<(MountOpts, &'a [String])> {
    let mut opts = MountOpts::default();
    let mut rest = args;
    while let Some(first) = rest.first() {
        if !first.starts_with('-') {
            break;
        }
        rest = &rest[1..];
        for flag in first.chars().skip(1) {
            match flag {
                'u' if allow_mnt_flags => opts.umount = true,
                'p' if allow_mnt_flags => opts.via_portmap = true,
                'T' => opts.proto = Some(Proto::Tcp),
                'U' => opts.proto = Some(Proto::Udp),
                'P' => {
                    let value = rest.first()?;
                    opts.port = Some(value.parse().ok()?);
                    rest = &rest[1..];
                }
                _ => return None,
            }
        }
    }
    Some((opts, rest))
}

/// `<uid>[.<gid>]`; a bare uid leaves the gid at -1.
fn parse_owner(arg: &str) -> Option<(u32, u32)> {
    match arg.split_once('.') {
        Some((uid, gid)) => Some((
            uid.parse::<i32>().ok()? as u32,
            gid.parse::<i32>().ok()? as u32,
        )),
        None => Some((arg.parse::<i32>().ok()? as u32, -1i32 as u32)),
    }
}

/// A handle is given as whitespace-separated hex bytes.
fn parse_handle(args: &[String]) -> Option<NfsFh3> {
    if args.is_empty() || args.len() > NFS3_FHSIZE {
        return None;
    }
    let mut data = Vec::with_capacity(args.len());
    for arg in args {
        data.push(u8::from_str_radix(arg, 16).ok()?);
    }
    Some(NfsFh3 { data })
}

fn mode_bits(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    out.push(if mode & 0o400 != 0 { 'r' } else { '-' });
    out.push(if mode & 0o200 != 0 { 'w' } else { '-' });
    out.push(match (mode & 0o100 != 0, mode & 0o4000 != 0) {
        (true, true) => 's',
        (true, false) => 'x',
        (false, true) => 'S',
        (false, false) => '-',
    });
    out.push(if mode & 0o40 != 0 { 'r' } else { '-' });
    out.push(if mode & 0o20 != 0 { 'w' } else { '-' });
    out.push(match (mode & 0o10 != 0, mode & 0o2000 != 0) {
        (true, true) => 's',
        (true, false) => 'x',
        (false, true) => 'S',
        (false, false) => '-',
    });
    out.push(if mode & 0o4 != 0 { 'r' } else { '-' });
    out.push(if mode & 0o2 != 0 { 'w' } else { '-' });
    out.push(match (mode & 0o1 != 0, mode & 0o1000 != 0) {
        (true, true) => 't',
        (true, false) => 'x',
        (false, true) => 'T',
        (false, false) => '-',
    });
    out
}

fn type_char(file_type: FileType3) -> char {
    match file_type {
        FileType3::Sock => 's',
        FileType3::Fifo => 'p',
        FileType3::Reg => '-',
        FileType3::Dir => 'd',
        FileType3::Blk => 'b',
        FileType3::Chr => 'c',
        FileType3::Lnk => 'l',
    }
}

/// ls-style date column: month/day/time for recent files, month/day/
/// year for anything older than six months or an hour into the future.
fn file_date(seconds: u32) -> String {
    use chrono::{Local, TimeZone};
    let stamp = seconds as i64;
    let now = Local::now().timestamp();
    let six_months = 6 * 30 * 24 * 60 * 60;
    let Some(when) = Local.timestamp_opt(stamp, 0).single() else {
        return format!(" {:<12} ", "?");
    };
    if stamp < now - six_months || stamp > now + 3600 {
        let day = when.format("%b %e").to_string();
        let year = when.format("%Y").to_string();
        format!(" {day:<7.7} {year:<4.4} ")
    } else {
        let day = when.format("%b %e %H:%M").to_string();
        format!(" {day:<12.12} ")
    }
}

type InputLines = Lines<BufReader<Stdin>>;

pub struct Shell {
    session: Session,
    interactive: bool,
}

impl Shell {
    pub fn new(verbose: bool, interactive: bool) -> Shell {
        Shell {
            session: Session::new(verbose),
            interactive,
        }
    }

    pub async fn run(&mut self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            if self.interactive {
                print!("nfs> ");
                let _ = std::io::stdout().flush();
            }
            let line = tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    _ => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    continue;
                }
            };
            let argv = tokenize(&line);
            if argv.is_empty() {
                continue;
            }
            match lookup_command(&argv[0]) {
                Some(Cmd::Quit) => break,
                Some(cmd) => {
                    // SIGINT abandons the command; the next call on an
                    // interrupted client may fail once and be retried.
                    tokio::select! {
                        _ = self.dispatch(cmd, &argv, &mut lines) => {}
                        _ = tokio::signal::ctrl_c() => println!(),
                    }
                }
                None => {
                    let trimmed = line.trim_start();
                    if let Some(command) = trimmed.strip_prefix('!') {
                        self.shell_escape(command).await;
                    } else {
                        eprintln!("{}: unrecognized command", argv[0]);
                    }
                }
            }
        }
        if self.session.has_host() {
            self.session.close_mount().await;
        }
    }

    async fn shell_escape(&self, command: &str) {
        let _ = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await;
        println!("!");
    }

    async fn dispatch(&mut self, cmd: Cmd, argv: &[String], lines: &mut InputLines) {
        match cmd {
            Cmd::Host => self.do_host(argv).await,
            Cmd::Uid => self.do_uid(argv),
            Cmd::Gid => self.do_gid(argv),
            Cmd::Cd => self.do_cd(argv).await,
            Cmd::Lcd => self.do_lcd(argv),
            Cmd::Cat => self.do_cat(argv).await,
            Cmd::Ls => self.do_ls(argv).await,
            Cmd::Get => self.do_get(argv, lines).await,
            Cmd::Df => self.do_df(argv).await,
            Cmd::Rm => self.do_rm(argv).await,
            Cmd::Ln => self.do_ln(argv).await,
            Cmd::Mv => self.do_mv(argv).await,
            Cmd::Mkdir => self.do_mkdir(argv).await,
            Cmd::Rmdir => self.do_rmdir(argv).await,
            Cmd::Chmod => self.do_chmod(argv).await,
            Cmd::Chown => self.do_chown(argv).await,
            Cmd::Put => self.do_put(argv).await,
            Cmd::Mount => self.do_mount(argv).await,
            Cmd::Umount => self.do_umount(argv).await,
            Cmd::Umountall => self.do_umountall(argv).await,
            Cmd::Export => self.do_export(argv).await,
            Cmd::Dump => self.do_dump(argv).await,
            Cmd::Status => self.do_status(argv),
            Cmd::Help => self.do_help(argv),
            Cmd::Handle => self.do_handle(argv).await,
            Cmd::Mknod => self.do_mknod(argv).await,
            Cmd::Quit => unreachable!("quit is handled by the loop"),
        }
    }

    async fn do_host(&mut self, argv: &[String]) {
        if argv.len() != 2 {
            eprintln!("Usage: host <host>");
            return;
        }
        if let Err(err) = self.session.open_mount(&argv[1]).await {
            eprintln!("{err}");
        }
    }

    fn do_uid(&mut self, argv: &[String]) {
        if argv.len() > 3 {
            eprintln!("Usage: uid [<uid> [<secret-key>]]");
            return;
        }
        if argv.len() == 3 {
            self.session.creds.flavor = AuthFlavor::Des;
            self.session.creds.uid = argv[1].parse::<i32>().unwrap_or(0) as u32;
            self.session.creds.secret_key = Some(argv[2].clone());
        } else {
            self.session.creds.flavor = AuthFlavor::Unix;
            self.session.creds.uid = match argv.get(1) {
                Some(arg) => arg.parse::<i32>().unwrap_or(0) as u32,
                None => NOBODY,
            };
        }
        if let Err(err) = self.session.apply_auth() {
            eprintln!("{err}");
        }
    }

    fn do_gid(&mut self, argv: &[String]) {
        self.session.creds.gid = match argv.get(1) {
            Some(arg) => arg.parse::<i32>().unwrap_or(0) as u32,
            None => NOBODY,
        };
        if let Err(err) = self.session.apply_auth() {
            eprintln!("{err}");
        }
    }

    async fn do_cd(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("cd: no remote file system mounted");
            return;
        }
        let path = argv.get(1).map(String::as_str);
        if let Err(err) = self.session.change_dir(path).await {
            eprintln!("{err}");
        }
    }

    fn do_lcd(&mut self, argv: &[String]) {
        let target = match argv.get(1) {
            Some(path) => path.clone(),
            None => match std::env::var("HOME") {
                Ok(home) => home,
                Err(_) => return,
            },
        };
        if let Err(err) = std::env::set_current_dir(&target) {
            eprintln!("lcd: {err}");
        }
    }

    async fn do_cat(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("cat: no remote file system mounted");
            return;
        }
        if argv.len() != 2 {
            eprintln!("Usage: cat <filespec>");
            return;
        }
        let mut stdout = std::io::stdout();
        if let Err(err) = self.session.read_file(&argv[1], &mut stdout).await {
            report("cat", &err);
        }
        let _ = stdout.flush();
    }

    async fn do_ls(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("ls: no remote file system mounted");
            return;
        }
        let mut args = &argv[1..];
        let mut long = false;
        if args.first().map(String::as_str) == Some("-l") {
            long = true;
            args = &args[1..];
        }
        let names = match self.session.read_dir_names().await {
            Ok(names) => names,
            Err(err) => {
                report("Readdir failed", &err);
                return;
            }
        };
        for name in names {
            if !listed(&name, args) {
                continue;
            }
            if long {
                self.print_long_entry(&name).await;
            } else {
                println!("{name}");
            }
        }
    }

    /// One `ls -l` line; the listing pays an extra LOOKUP per name
    /// because READDIR replies carry no attributes.
    async fn print_long_entry(&mut self, name: &str) {
        let (fh, attrs) = match self.session.lookup_entry(name).await {
            Ok(found) => found,
            Err(err) => {
                report("Lookup failed", &err);
                return;
            }
        };
        print!(
            "{}{}{:>3}{:>9}{:>6}{:>10}{}{}",
            type_char(attrs.file_type),
            mode_bits(attrs.mode),
            attrs.num_links,
            attrs.uid,
            attrs.gid,
            attrs.size,
            file_date(attrs.ctime.seconds),
            name,
        );
        if attrs.file_type == FileType3::Lnk {
            match self.session.read_link(&fh).await {
                Ok(target) => println!(" -> {target}"),
                Err(err) => {
                    println!();
                    report("Readlink failed", &err);
                }
            }
        } else {
            println!();
        }
    }

    async fn do_get(&mut self, argv: &[String], lines: &mut InputLines) {
        if !self.session.mounted() {
            eprintln!("get: no remote file system mounted");
            return;
        }
        let mut args = &argv[1..];
        let mut no_prompt = false;
        if args.first().map(String::as_str) == Some("-i") {
            no_prompt = true;
            args = &args[1..];
        }
        let names = match self.session.read_dir_names().await {
            Ok(names) => names,
            Err(err) => {
                report("Readdir failed", &err);
                return;
            }
        };
        for name in names {
            // match before going over the wire
            if !listed(&name, args) {
                continue;
            }
            let (fh, attrs) = match self.session.lookup_entry(&name).await {
                Ok(found) => found,
                Err(err) => {
                    report("Lookup failed", &err);
                    return;
                }
            };
            // only regular files can be transferred
            if attrs.file_type != FileType3::Reg {
                continue;
            }

            print!("{name}? ");
            let _ = std::io::stdout().flush();
            if no_prompt {
                println!("Yes");
            } else {
                match lines.next_line().await {
                    Ok(Some(answer))
                        if matches!(answer.chars().next(), Some('y') | Some('Y')) => {}
                    _ => continue,
                }
            }

            let mut file = match std::fs::File::create(&name) {
                Ok(file) => file,
                Err(_) => {
                    eprintln!("get: cannot create {name}");
                    continue;
                }
            };
            match self
                .session
                .read_file_handle(&name, &fh, attrs.size, &mut file)
                .await
            {
                Ok(read) => {
                    if read != attrs.size {
                        eprintln!(
                            "{name}: size mismatch on read (expected {}, read {read})",
                            attrs.size
                        );
                    }
                }
                Err(err) => report("Read failed", &err),
            }
        }
    }

    async fn do_df(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("df: no remote file system mounted");
            return;
        }
        if argv.len() != 1 {
            eprintln!("Usage: df");
            return;
        }
        match self.session.fs_stat().await {
            Ok(stat) => {
                let host = self.session.remote_host.as_deref().unwrap_or("");
                let path = self.session.mount_path.as_deref().unwrap_or("");
                println!(
                    "{host}:{path}    {}K, {}K used, {}K free ({}K useable).",
                    stat.tbytes / 1024,
                    (stat.tbytes - stat.fbytes) / 1024,
                    stat.fbytes / 1024,
                    stat.abytes / 1024,
                );
            }
            Err(err) => report("Df failed", &err),
        }
    }

    async fn do_rm(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("rm: no remote file system mounted");
            return;
        }
        if argv.len() != 2 {
            eprintln!("Usage: rm <file>");
            return;
        }
        if let Err(err) = self.session.remove_file(&argv[1]).await {
            report("Remove failed", &err);
        }
    }

    async fn do_ln(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("ln: no remote file system mounted");
            return;
        }
        if argv.len() != 3 {
            eprintln!("Usage: ln <file1> <file2>");
            return;
        }
        if let Err(err) = self.session.link(&argv[1], &argv[2]).await {
            report("Link failed", &err);
        }
    }

    async fn do_mv(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("mv: no remote file system mounted");
            return;
        }
        if argv.len() != 3 {
            eprintln!("Usage: mv <file1> <file2>");
            return;
        }
        if let Err(err) = self.session.rename(&argv[1], &argv[2]).await {
            report("Rename failed", &err);
        }
    }

    async fn do_mkdir(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("mkdir: no remote file system mounted");
            return;
        }
        if argv.len() != 2 {
            eprintln!("Usage: mkdir <directory>");
            return;
        }
        if let Err(err) = self.session.make_dir(&argv[1]).await {
            report("Make directory failed", &err);
        }
    }

    async fn do_rmdir(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("rmdir: no remote file system mounted");
            return;
        }
        if argv.len() != 2 {
            eprintln!("Usage: rmdir <directory>");
            return;
        }
        if let Err(err) = self.session.remove_dir(&argv[1]).await {
            report("Remove directory failed", &err);
        }
    }

    async fn do_chmod(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("chmod: no remote file system mounted");
            return;
        }
        if argv.len() != 3 {
            eprintln!("Usage: chmod <mode> <file>");
            return;
        }
        let Ok(mode) = u32::from_str_radix(&argv[1], 8) else {
            eprintln!("chmod: invalid mode");
            return;
        };
        if let Err(err) = self.session.set_mode(&argv[2], mode).await {
            report("Set attributes failed", &err);
        }
    }

    async fn do_chown(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("chown: no remote file system mounted");
            return;
        }
        if argv.len() != 3 {
            eprintln!("Usage: chown <uid>[.<gid>] <file>");
            return;
        }
        let Some((uid, gid)) = parse_owner(&argv[1]) else {
            eprintln!("chown: invalid uid[.gid]");
            return;
        };
        if let Err(err) = self.session.set_owner(&argv[2], uid, gid).await {
            report("Set attributes failed", &err);
        }
    }

    async fn do_put(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("put: no remote file system mounted");
            return;
        }
        if argv.len() != 2 && argv.len() != 3 {
            eprintln!("Usage: put <local-file> [<remote-file>]");
            return;
        }
        let mut local = match std::fs::File::open(&argv[1]) {
            Ok(file) => file,
            Err(_) => {
                eprintln!("put: cannot open {}", argv[1]);
                return;
            }
        };
        let remote = argv.get(2).unwrap_or(&argv[1]);
        if let Err(err) = self.session.write_file(&mut local, remote).await {
            report("Write failed", &err);
        }
    }

    async fn do_mount(&mut self, argv: &[String]) {
        let Some((opts, rest)) = parse_mount_opts(&argv[1..], true) else {
            eprintln!("Usage: mount [-upTU] [-P port] <path>");
            return;
        };
        if rest.len() != 1 {
            eprintln!("Usage: mount [-upTU] [-P port] <path>");
            return;
        }
        if !self.session.has_host() {
            eprintln!("mount: no host specified");
            return;
        }
        if let Err(err) = self.session.mount_export(&rest[0], opts).await {
            match err {
                Error::Mount(_) => eprintln!("Mount failed: {err}"),
                other => eprintln!("{other}"),
            }
        }
    }

    async fn do_umount(&mut self, argv: &[String]) {
        if argv.len() != 1 {
            eprintln!("Usage: umount");
            return;
        }
        if !self.session.mounted() {
            eprintln!("umount: no remote file system mounted");
            return;
        }
        self.session.close_nfs().await;
    }

    async fn do_umountall(&mut self, argv: &[String]) {
        if argv.len() != 1 {
            eprintln!("Usage: umountall");
            return;
        }
        if !self.session.has_host() {
            eprintln!("umountall: no host specified");
            return;
        }
        if let Err(err) = self.session.umount_all().await {
            eprintln!("{err}");
        }
    }

    async fn do_export(&mut self, argv: &[String]) {
        let mut args = &argv[1..];
        let mut hosts_only = false;
        if args.first().map(String::as_str) == Some("-h") {
            hosts_only = true;
            args = &args[1..];
        }
        if !args.is_empty() {
            eprintln!("Usage: export [-h]");
            return;
        }
        if !self.session.has_host() {
            eprintln!("export: no host specified");
            return;
        }
        let exports = match self.session.export_list().await {
            Ok(exports) => exports,
            Err(err) => {
                eprintln!("export: {err}");
                return;
            }
        };
        let host = self.session.remote_host.as_deref().unwrap_or("");
        println!("Export list for {host}:");
        for export in exports {
            print!("{:<25}", export.dir);
            if !hosts_only {
                if export.dir.len() >= 25 {
                    print!("\n                    ");
                }
                if export.groups.is_empty() {
                    print!("everyone");
                }
                for group in &export.groups {
                    print!("{group} ");
                }
            }
            println!();
        }
    }

    async fn do_dump(&mut self, argv: &[String]) {
        if argv.len() != 1 {
            eprintln!("Usage: dump");
            return;
        }
        if !self.session.has_host() {
            eprintln!("dump: no host specified");
            return;
        }
        match self.session.dump_list().await {
            Ok(mounts) => {
                for entry in mounts {
                    println!("{}:{}", entry.hostname, entry.directory);
                }
            }
            Err(err) => eprintln!("dump: {err}"),
        }
    }

    fn do_status(&self, argv: &[String]) {
        if argv.len() != 1 {
            eprintln!("Usage: status");
            return;
        }
        println!("User id      : {}", self.session.creds.uid as i32);
        println!("Group id     : {}", self.session.creds.gid as i32);
        if let Some(host) = &self.session.remote_host {
            println!("Remote host  : `{host}'");
        }
        if let Some(path) = &self.session.mount_path {
            println!("Mount path   : `{path}'");
        }
        println!("Transfer size: {}", self.session.transfer_size);
    }

    fn do_help(&self, argv: &[String]) {
        for (kw, _, help) in KEYWORDS {
            if argv.len() == 2 && argv[1] != *kw {
                continue;
            }
            println!("{kw} {help}");
        }
    }

    async fn do_handle(&mut self, argv: &[String]) {
        let Some((opts, rest)) = parse_mount_opts(&argv[1..], false) else {
            eprintln!("Usage: handle [-TU] [-P port] [<file handle>]");
            return;
        };
        if rest.is_empty() {
            if !self.session.mounted() {
                eprintln!("handle: no remote file system mounted");
                return;
            }
            let path = self.session.mount_path.as_deref().unwrap_or("");
            print!("{path}:");
            if let Some(handle) = &self.session.cwd_handle {
                for byte in &handle.data {
                    print!(" {byte:02x}");
                }
            }
            println!();
            return;
        }
        let Some(handle) = parse_handle(rest) else {
            eprintln!("Usage: handle [-TU] [-P port] [<file handle>]");
            return;
        };
        if !self.session.has_host() {
            eprintln!("handle: no host specified");
            return;
        }
        if let Err(err) = self.session.mount_raw_handle(handle, opts).await {
            eprintln!("{err}");
        }
    }

    async fn do_mknod(&mut self, argv: &[String]) {
        if !self.session.mounted() {
            eprintln!("mknod: no remote file system mounted");
            return;
        }
        let usage = || eprintln!("Usage: mknod <name> [b/c major minor] [p]");
        if (argv.len() != 3 && argv.len() != 5) || argv[2].len() != 1 {
            usage();
            return;
        }
        let mode = 0o777;
        let attrs =
            SetAttributes::with_mode_owner(mode, self.session.creds.uid, self.session.creds.gid);
        let what = if argv.len() == 3 {
            if argv[2] != "p" {
                usage();
                return;
            }
            MknodData3::Fifo(attrs)
        } else {
            let (Ok(major), Ok(minor)) = (argv[3].parse::<u32>(), argv[4].parse::<u32>()) else {
                usage();
                return;
            };
            let device = DeviceData3 {
                attributes: attrs,
                spec: crate::nfs3::SpecData3 {
                    data1: major,
                    data2: minor,
                },
            };
            match argv[2].as_str() {
                "b" => MknodData3::Blk(device),
                "c" => MknodData3::Chr(device),
                _ => {
                    usage();
                    return;
                }
            }
        };
        if let Err(err) = self.session.make_node(&argv[1], what).await {
            eprintln!("WARNING: Mknod failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_is_whitespace_only() {
        assert_eq!(tokenize("  ls   -l  *.txt "), vec!["ls", "-l", "*.txt"]);
        assert!(tokenize("   \t ").is_empty());
        // no quoting
        assert_eq!(tokenize("cat 'a b'"), vec!["cat", "'a", "b'"]);
    }

    #[test]
    fn keyword_table_resolves_aliases() {
        assert_eq!(lookup_command("quit"), Some(Cmd::Quit));
        assert_eq!(lookup_command("bye"), Some(Cmd::Quit));
        assert_eq!(lookup_command("mknod"), Some(Cmd::Mknod));
        assert_eq!(lookup_command("frobnicate"), None);
    }

    #[test]
    fn mount_flags_parse_combined_and_split() {
        let args: Vec<String> = ["-up", "-P", "2049", "/export/pub"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (opts, rest) = parse_mount_opts(&args, true).unwrap();
        assert!(opts.umount);
        assert!(opts.via_portmap);
        assert_eq!(opts.port, Some(2049));
        assert_eq!(rest, &["/export/pub".to_string()][..]);

        let args: Vec<String> = ["-T", "/a"].iter().map(|s| s.to_string()).collect();
        let (opts, _) = parse_mount_opts(&args, true).unwrap();
        assert_eq!(opts.proto, Some(Proto::Tcp));

        // mount-only flags rejected for handle
        let args: Vec<String> = ["-u", "x"].iter().map(|s| s.to_string()).collect();
        assert!(parse_mount_opts(&args, false).is_none());
    }

    #[test]
    fn owner_parses_uid_and_optional_gid() {
        assert_eq!(parse_owner("1000.100"), Some((1000, 100)));
        assert_eq!(parse_owner("0"), Some((0, u32::MAX)));
        assert_eq!(parse_owner("-2"), Some((0xffff_fffe, u32::MAX)));
        assert_eq!(parse_owner("root"), None);
    }

    #[test]
    fn handle_hex_roundtrip() {
        let args: Vec<String> = ["0a", "ff", "00", "7b"].iter().map(|s| s.to_string()).collect();
        let handle = parse_handle(&args).unwrap();
        assert_eq!(handle.data, vec![0x0a, 0xff, 0x00, 0x7b]);

        let printed: Vec<String> = handle.data.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(printed, vec!["0a", "ff", "00", "7b"]);

        let too_many: Vec<String> = (0..65).map(|_| "aa".to_string()).collect();
        assert!(parse_handle(&too_many).is_none());
        assert!(parse_handle(&["zz".to_string()]).is_none());
    }

    #[test]
    fn bare_listing_hides_dotfiles() {
        assert!(listed("file1", &[]));
        assert!(listed("dir1", &[]));
        assert!(!listed(".hidden", &[]));
        let dot_star = vec![".*".to_string()];
        assert!(listed(".hidden", &dot_star));
        assert!(!listed("file1", &dot_star));
    }

    #[test]
    fn mode_bits_render_specials() {
        assert_eq!(mode_bits(0o755), "rwxr-xr-x");
        assert_eq!(mode_bits(0o4755), "rwsr-xr-x");
        assert_eq!(mode_bits(0o4644), "rwSr--r--");
        assert_eq!(mode_bits(0o1777), "rwxrwxrwt");
        assert_eq!(mode_bits(0o1666), "rw-rw-rwT");
        assert_eq!(mode_bits(0o2711), "rwx--s--x");
    }
}
