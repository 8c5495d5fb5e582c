use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use fdshim::sys::{dirent, SEEK_CUR, SEEK_END, SEEK_SET};
use fdshim::{Errno, FileSystem, NativeHost, OpenMode, SysError, Timespec};

fn setup() -> (TempDir, FileSystem<NativeHost>) {
    let dir = TempDir::new().unwrap();
    (dir, FileSystem::new(NativeHost::new()))
}

fn path_in(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_str().unwrap().to_string()
}

fn errno(err: SysError) -> Errno {
    err.errno().expect("expected an errno, got a fatal error")
}

#[test]
fn open_reports_host_errors() {
    let (dir, fs) = setup();
    let missing = path_in(&dir, "missing.txt");
    assert_eq!(errno(fs.open(&missing, OpenMode::RDONLY, 0).unwrap_err()), Errno::ENOENT);

    let existing = path_in(&dir, "existing.txt");
    std::fs::write(&existing, "x").unwrap();
    let err = fs
        .open(&existing, OpenMode::WRONLY | OpenMode::CREATE | OpenMode::EXCL, 0o644)
        .unwrap_err();
    assert_eq!(errno(err), Errno::EEXIST);
    assert_eq!(fs.descriptors().len(), 3);
}

#[test]
fn write_seek_read_round_trip() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "data.bin");

    let fd = fs
        .open(&path, OpenMode::RDWR | OpenMode::CREATE | OpenMode::TRUNC, 0o644)
        .unwrap();
    assert_eq!(fs.seek(fd, 10, SEEK_SET).unwrap(), 10);
    assert_eq!(fs.write(fd, b"payload").unwrap(), 7);
    assert_eq!(fs.seek(fd, 0, SEEK_CUR).unwrap(), 17);
    assert_eq!(fs.seek(fd, 0, SEEK_END).unwrap(), 17);

    assert_eq!(fs.seek(fd, 10, SEEK_SET).unwrap(), 10);
    let mut buf = [0u8; 32];
    let n = fs.read(fd, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"payload");
    fs.close(fd).unwrap();

    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk.len(), 17);
    assert!(on_disk[..10].iter().all(|&b| b == 0));
}

#[test]
fn sequential_reads_without_seek() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "seq.txt");
    std::fs::write(&path, "abcdefgh").unwrap();

    let fd = fs.open(&path, OpenMode::RDONLY, 0).unwrap();
    let mut buf = [0u8; 3];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf, b"abc");
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf, b"def");
    assert_eq!(fs.seek(fd, 0, SEEK_CUR).unwrap(), 6);
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 2);
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    fs.close(fd).unwrap();
}

#[test]
fn positioned_io_leaves_cursor() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "p.txt");
    std::fs::write(&path, "0123456789").unwrap();

    let fd = fs.open(&path, OpenMode::RDWR, 0).unwrap();
    assert_eq!(fs.seek(fd, 2, SEEK_SET).unwrap(), 2);

    let mut buf = [0u8; 3];
    assert_eq!(fs.pread(fd, &mut buf, 5).unwrap(), 3);
    assert_eq!(&buf, b"567");
    assert_eq!(fs.pwrite(fd, b"XY", 0).unwrap(), 2);
    assert_eq!(fs.seek(fd, 0, SEEK_CUR).unwrap(), 2);

    assert_eq!(fs.read(fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf, b"234");
    fs.close(fd).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "XY23456789");
}

#[test]
fn negative_seek_is_rejected() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "neg.txt");
    std::fs::write(&path, "abc").unwrap();

    let fd = fs.open(&path, OpenMode::RDONLY, 0).unwrap();
    assert_eq!(fs.seek(fd, 1, SEEK_SET).unwrap(), 1);
    assert_eq!(errno(fs.seek(fd, -5, SEEK_CUR).unwrap_err()), Errno::EINVAL);
    assert_eq!(errno(fs.seek(fd, -4, SEEK_END).unwrap_err()), Errno::EINVAL);
    assert_eq!(fs.seek(fd, 0, SEEK_CUR).unwrap(), 1);
    fs.close(fd).unwrap();
}

#[test]
fn directory_enumeration() {
    let (dir, fs) = setup();
    for name in ["a", "bb", "ccc"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }
    let root = dir.path().to_str().unwrap();

    let fd = fs.open(root, OpenMode::RDONLY, 0).unwrap();
    let mut small = [0u8; 3];
    assert_eq!(fs.read_dirent(fd, &mut small).unwrap(), 3);

    let mut rest = [0u8; 64];
    let n = fs.read_dirent(fd, &mut rest).unwrap();
    let mut names = dirent::parse(&small).unwrap();
    names.extend(dirent::parse(&rest[..n]).unwrap());
    names.sort();
    assert_eq!(names, vec!["a", "bb", "ccc"]);

    assert_eq!(fs.read_dirent(fd, &mut rest).unwrap(), 0);
    fs.close(fd).unwrap();
}

#[test]
fn metadata_operations() {
    let (dir, fs) = setup();
    let sub = path_in(&dir, "sub");
    fs.mkdir(&sub, 0o755).unwrap();
    assert!(fs.stat(&sub).unwrap().is_dir());
    assert_eq!(errno(fs.mkdir(&sub, 0o755).unwrap_err()), Errno::EEXIST);

    let file = path_in(&dir, "sub/f.txt");
    std::fs::write(&file, "hello world").unwrap();
    assert_eq!(errno(fs.rmdir(&sub).unwrap_err()), Errno::ENOTEMPTY);

    fs.truncate(&file, 5).unwrap();
    assert_eq!(fs.stat(&file).unwrap().size, 5);

    fs.chmod(&file, 0o600).unwrap();
    assert_eq!(fs.stat(&file).unwrap().mode & 0o777, 0o600);

    let times = [Timespec { sec: 1_000, nsec: 0 }, Timespec { sec: 2_000, nsec: 0 }];
    fs.utimes_nano(&file, &times).unwrap();
    let st = fs.stat(&file).unwrap();
    assert_eq!(st.atime.sec, 1_000);
    assert_eq!(st.mtime.sec, 2_000);

    let moved = path_in(&dir, "moved.txt");
    fs.rename(&file, &moved).unwrap();
    assert_eq!(errno(fs.stat(&file).unwrap_err()), Errno::ENOENT);

    let hard = path_in(&dir, "hard.txt");
    fs.link(&moved, &hard).unwrap();
    assert_eq!(fs.stat(&hard).unwrap().nlink, 2);

    let soft = path_in(&dir, "soft.txt");
    fs.symlink(&moved, &soft).unwrap();
    assert!(fs.lstat(&soft).unwrap().is_symlink());
    assert!(!fs.stat(&soft).unwrap().is_symlink());
    let mut buf = [0u8; 256];
    let n = fs.readlink(&soft, &mut buf).unwrap();
    assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), moved);

    fs.unlink(&soft).unwrap();
    fs.unlink(&hard).unwrap();
    fs.unlink(&moved).unwrap();
    fs.rmdir(&sub).unwrap();
    assert_eq!(errno(fs.unlink(&moved).unwrap_err()), Errno::ENOENT);
}

#[test]
fn descriptor_metadata_operations() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "fd.txt");

    let fd = fs
        .open(&path, OpenMode::WRONLY | OpenMode::CREATE, 0o644)
        .unwrap();
    assert_eq!(fs.write(fd, b"0123456789").unwrap(), 10);
    fs.ftruncate(fd, 4).unwrap();
    fs.fchmod(fd, 0o640).unwrap();
    fs.fsync(fd).unwrap();

    let st = fs.fstat(fd).unwrap();
    assert_eq!(st.size, 4);
    assert_eq!(st.mode & 0o777, 0o640);
    fs.close(fd).unwrap();
}

#[test]
fn append_mode_writes_at_end() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "log.txt");
    std::fs::write(&path, "one\n").unwrap();

    let fd = fs
        .open(&path, OpenMode::WRONLY | OpenMode::APPEND, 0)
        .unwrap();
    fs.write(fd, b"two\n").unwrap();
    fs.close(fd).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn closed_descriptor_is_ebadf() {
    let (dir, fs) = setup();
    let path = path_in(&dir, "c.txt");
    std::fs::write(&path, "c").unwrap();

    let fd = fs.open(&path, OpenMode::RDONLY, 0).unwrap();
    fs.close(fd).unwrap();
    assert_eq!(errno(fs.close(fd).unwrap_err()), Errno::EBADF);
    let mut buf = [0u8; 1];
    assert_eq!(errno(fs.read(fd, &mut buf).unwrap_err()), Errno::EBADF);
    assert_eq!(errno(fs.fsync(fd).unwrap_err()), Errno::EBADF);
}

#[test]
fn current_directory_is_absolute() {
    let fs = FileSystem::new(NativeHost::new());
    let cwd = fs.current_dir().unwrap();
    assert_eq!(cwd, std::env::current_dir().unwrap().to_str().unwrap());
}

#[test]
fn concurrent_open_close() {
    let (dir, fs) = setup();
    let fs = Arc::new(fs);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let fs = Arc::clone(&fs);
            let path = path_in(&dir, &format!("t{i}.txt"));
            thread::spawn(move || {
                for _ in 0..16 {
                    let fd = fs
                        .open(&path, OpenMode::RDWR | OpenMode::CREATE, 0o644)
                        .unwrap();
                    fs.write(fd, b"x").unwrap();
                    fs.close(fd).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs.descriptors().len(), 3);
}
