#![allow(dead_code)]
use std::fs;
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{tempdir, TempDir};

/// A build log shaped like the text `gunzip -c | strings` recovers from a
/// Swift build: three errors, three warnings and one note.
pub const SAMPLE_LOG: &str = r#"SwiftCompile normal arm64 /Users/developer/MyProject/Sources/App/AppDelegate.swift
    cd /Users/developer/MyProject
    /Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/bin/swift -frontend -c -primary-file
    
/Users/developer/MyProject/Sources/App/AppDelegate.swift:25:18: error: use of unresolved identifier 'AppConfiguration'
        let config = AppConfiguration()
                     ^~~~~~~~~~~~~~~~
/Users/developer/MyProject/Sources/App/AppDelegate.swift:25:18: note: did you mean 'URLSessionConfiguration'?
        let config = AppConfiguration()
                     ^~~~~~~~~~~~~~~~
                     URLSessionConfiguration
/Users/developer/MyProject/Sources/App/ViewController.swift:42:10: warning: result of call to 'loadView()' is unused
        self.loadView()
        ^~~~~~~~~~~~
/Users/developer/MyProject/Sources/App/ViewController.swift:48:27: warning: string interpolation produces a debug description for an optional value; did you mean to make this explicit?
        print("User name: \(user.name)")
                          ^~~~~~~~~~~
/Users/developer/MyProject/Sources/App/ViewController.swift:53:14: error: value of type 'UIView' has no member 'setText'
        myView.setText("Hello World")
        ~~~~~~ ^~~~~~~
/Users/developer/MyProject/Sources/Services/NetworkManager.swift:112:40: warning: initialization of immutable value 'response' was never used
        let data = responseData, let response = httpResponse {
                                       ^~~~~~~~
/Users/developer/MyProject/Sources/Services/NetworkManager.swift:122:22: error: cannot convert value of type 'String' to expected argument type 'URL'
        let task = session.dataTask(with: "https://api.example.com")
                                         ^~~~~~~~~~~~~~~~~~~~~~~~~~~
"#;

/// A temporary DerivedData tree. Dropping it removes everything.
pub struct DerivedDataFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl DerivedDataFixture {
    pub fn new() -> IoResult<Self> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path().join("DerivedData");
        fs::create_dir_all(&root)?;
        Ok(DerivedDataFixture { temp_dir, root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates `<root>/<dir_name>/Logs/Build` and returns it.
    pub fn add_project(&self, dir_name: &str) -> IoResult<PathBuf> {
        let logs = self.root.join(dir_name).join("Logs").join("Build");
        fs::create_dir_all(&logs)?;
        Ok(logs)
    }

    /// Writes a plain-text log `age` old into the project's build logs.
    pub fn add_log(
        &self,
        dir_name: &str,
        file_name: &str,
        contents: &str,
        age: Duration,
    ) -> IoResult<PathBuf> {
        let path = self.add_project(dir_name)?.join(file_name);
        fs::write(&path, contents)?;
        let file = fs::File::options().write(true).open(&path)?;
        file.set_modified(SystemTime::now() - age)?;
        Ok(path)
    }
}
