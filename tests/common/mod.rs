#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use tempfile::TempDir;
use video_relay::config::ServerConfig;

/// 用 shell 脚本模拟 yt-dlp 的几种行为
#[derive(Debug, Clone, Copy)]
pub enum FakeYtDlp {
    /// 输出进度并生成文件
    Success,
    /// 以退出码 1 结束
    Failure,
    /// 退出码 0 但不生成文件
    NoArtifact,
    /// 下载和格式列表都很慢
    Slow,
}

const SUCCESS: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  case "$arg" in
    --get-title)
      echo "Fake Title"
      exit 0
      ;;
    --list-formats)
      echo "[info] Available formats for v:"
      echo "ID  EXT   RESOLUTION | FILESIZE"
      echo "140 m4a   audio only | 3.2MiB  m4a_dash"
      echo "22  mp4   1280x720   | 20MiB   video avc1"
      echo "18  mp4   640x360"
      exit 0
      ;;
  esac
  if [ "$prev" = "-o" ]; then
    out="$arg"
  fi
  prev="$arg"
done
echo "[generic] Extracting URL"
echo "[download]  45.2% of 10.00MiB at 1.2MiB/s ETA 00:20"
echo "[download] 100% of 10.00MiB in 00:05" 1>&2
file=$(printf '%s' "$out" | sed 's/%(ext)s$/mp4/')
printf 'fake video bytes' > "$file"
exit 0
"#;

const FAILURE: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --get-title)
      exit 1
      ;;
  esac
done
echo "[generic] Extracting URL"
echo "ERROR: [generic] Unsupported URL: https://example.com/v.mp4" 1>&2
exit 1
"#;

const NO_ARTIFACT: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --get-title)
      echo "Fake Title"
      exit 0
      ;;
  esac
done
echo "[download]  10.0% of 10.00MiB at 1.0MiB/s ETA 00:09"
exit 0
"#;

const SLOW: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  case "$arg" in
    --get-title)
      echo "Slow Title"
      exit 0
      ;;
    --list-formats)
      sleep 5
      exit 0
      ;;
  esac
  if [ "$prev" = "-o" ]; then
    out="$arg"
  fi
  prev="$arg"
done
sleep 2
file=$(printf '%s' "$out" | sed 's/%(ext)s$/mp4/')
printf 'slow' > "$file"
exit 0
"#;

static SCRIPTS: OnceLock<TempDir> = OnceLock::new();

/// 所有脚本一次性写好，避免写文件和其他测试 fork 子进程交错导致 ETXTBSY
fn scripts_dir() -> &'static Path {
    SCRIPTS
        .get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            for (name, body) in [
                ("success.sh", SUCCESS),
                ("failure.sh", FAILURE),
                ("no_artifact.sh", NO_ARTIFACT),
                ("slow.sh", SLOW),
            ] {
                let path = dir.path().join(name);
                std::fs::write(&path, body).unwrap();
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
            dir
        })
        .path()
}

pub fn fake_ytdlp(kind: FakeYtDlp) -> String {
    let name = match kind {
        FakeYtDlp::Success => "success.sh",
        FakeYtDlp::Failure => "failure.sh",
        FakeYtDlp::NoArtifact => "no_artifact.sh",
        FakeYtDlp::Slow => "slow.sh",
    };
    scripts_dir().join(name).to_string_lossy().into_owned()
}

pub fn test_config(download_dir: &Path, kind: FakeYtDlp) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        download_dir: PathBuf::from(download_dir),
        ytdlp_path: fake_ytdlp(kind),
        formats_timeout: Duration::from_secs(1),
        title_timeout: Duration::from_secs(5),
        cleanup_delay: Duration::ZERO,
        ..ServerConfig::default()
    }
}

/// 轮询直到条件满足，超时返回 false
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}
