//! Standard library import paths (Go 1.23).
//!
//! The table is data: regenerate it from `go list std` when the target Go
//! version moves, keeping it sorted. `internal/...` and `cmd/...` packages are
//! not listed; they cannot be imported from user code.

/// Importable standard library packages, sorted.
pub const PACKAGES: &[&str] = &[
    "C",
    "archive/tar",
    "archive/zip",
    "bufio",
    "bytes",
    "cmp",
    "compress/bzip2",
    "compress/flate",
    "compress/gzip",
    "compress/lzw",
    "compress/zlib",
    "container/heap",
    "container/list",
    "container/ring",
    "context",
    "crypto",
    "crypto/aes",
    "crypto/cipher",
    "crypto/des",
    "crypto/dsa",
    "crypto/ecdh",
    "crypto/ecdsa",
    "crypto/ed25519",
    "crypto/elliptic",
    "crypto/hmac",
    "crypto/md5",
    "crypto/rand",
    "crypto/rc4",
    "crypto/rsa",
    "crypto/sha1",
    "crypto/sha256",
    "crypto/sha512",
    "crypto/subtle",
    "crypto/tls",
    "crypto/x509",
    "crypto/x509/pkix",
    "database/sql",
    "database/sql/driver",
    "debug/buildinfo",
    "debug/dwarf",
    "debug/elf",
    "debug/gosym",
    "debug/macho",
    "debug/pe",
    "debug/plan9obj",
    "embed",
    "encoding",
    "encoding/ascii85",
    "encoding/asn1",
    "encoding/base32",
    "encoding/base64",
    "encoding/binary",
    "encoding/csv",
    "encoding/gob",
    "encoding/hex",
    "encoding/json",
    "encoding/pem",
    "encoding/xml",
    "errors",
    "expvar",
    "flag",
    "fmt",
    "go/ast",
    "go/build",
    "go/build/constraint",
    "go/constant",
    "go/doc",
    "go/doc/comment",
    "go/format",
    "go/importer",
    "go/parser",
    "go/printer",
    "go/scanner",
    "go/token",
    "go/types",
    "go/version",
    "hash",
    "hash/adler32",
    "hash/crc32",
    "hash/crc64",
    "hash/fnv",
    "hash/maphash",
    "html",
    "html/template",
    "image",
    "image/color",
    "image/color/palette",
    "image/draw",
    "image/gif",
    "image/jpeg",
    "image/png",
    "index/suffixarray",
    "io",
    "io/fs",
    "io/ioutil",
    "iter",
    "log",
    "log/slog",
    "log/syslog",
    "maps",
    "math",
    "math/big",
    "math/bits",
    "math/cmplx",
    "math/rand",
    "math/rand/v2",
    "mime",
    "mime/multipart",
    "mime/quotedprintable",
    "net",
    "net/http",
    "net/http/cgi",
    "net/http/cookiejar",
    "net/http/fcgi",
    "net/http/httptest",
    "net/http/httptrace",
    "net/http/httputil",
    "net/http/pprof",
    "net/mail",
    "net/netip",
    "net/rpc",
    "net/rpc/jsonrpc",
    "net/smtp",
    "net/textproto",
    "net/url",
    "os",
    "os/exec",
    "os/signal",
    "os/user",
    "path",
    "path/filepath",
    "plugin",
    "reflect",
    "regexp",
    "regexp/syntax",
    "runtime",
    "runtime/cgo",
    "runtime/coverage",
    "runtime/debug",
    "runtime/metrics",
    "runtime/pprof",
    "runtime/race",
    "runtime/trace",
    "slices",
    "sort",
    "strconv",
    "strings",
    "structs",
    "sync",
    "sync/atomic",
    "syscall",
    "syscall/js",
    "testing",
    "testing/fstest",
    "testing/iotest",
    "testing/quick",
    "testing/slogtest",
    "text/scanner",
    "text/tabwriter",
    "text/template",
    "text/template/parse",
    "time",
    "time/tzdata",
    "unicode",
    "unicode/utf16",
    "unicode/utf8",
    "unique",
    "unsafe",
];

/// First segments that are never standard library roots, even though the
/// Go tree has directories by these names.
const NOT_ROOTS: &[&str] = &["cmd", "internal", "vendor"];

/// True when `path` names a standard library package or a package below
/// one (`S`, `S/...`, or a path whose first segment is a stdlib root).
pub fn is_stdlib(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    if PACKAGES.binary_search(&path).is_ok() {
        return true;
    }
    let first = path.split('/').next().unwrap_or(path);
    if NOT_ROOTS.contains(&first) {
        return false;
    }
    // `S/...` for a listed S, then bare first-segment roots
    let mut prefix = path;
    while let Some((parent, _)) = prefix.rsplit_once('/') {
        if PACKAGES.binary_search(&parent).is_ok() {
            return true;
        }
        prefix = parent;
    }
    PACKAGES.binary_search(&first).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        assert!(PACKAGES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn matches_listed_nested_and_roots() {
        assert!(is_stdlib("fmt"));
        assert!(is_stdlib("encoding/json"));
        assert!(is_stdlib("net/http/internal/ascii"));
        assert!(is_stdlib("crypto/internal/boring"));
        assert!(!is_stdlib("internal/util"));
        assert!(!is_stdlib("vendor/golang.org/x/net"));
        assert!(!is_stdlib("config"));
        assert!(!is_stdlib("example.com/other"));
        assert!(!is_stdlib(""));
    }
}
