//! 锁定（受保护）包名列表，这些系统应用永远不能被标记为卸载

use std::collections::HashSet;

/// 内置锁定列表
pub const LOCKED_APPS: &[&str] = &[
    "android.process.media",
    "com.android.blockednumber",
    "com.android.bluetooth",
    "com.android.captiveportallogin",
    "com.android.certinstaller",
    "com.android.companiondevicemanager",
    "com.android.cts.priv.ctsshim",
    "com.android.defcontainer",
    "com.android.incallui",
    "com.android.location.fused",
    "com.android.nfc",
    "com.android.phone",
    "com.android.providers.contacts",
    "com.android.providers.downloads",
    "com.android.providers.downloads.ui",
    "com.android.providers.media",
    "com.android.providers.settings",
    "com.android.providers.telephony",
    "com.android.se",
    "com.android.settings",
    "com.android.settings.intelligence",
    "com.android.sharedstoragebackup",
    "com.android.shell",
    "com.android.simappdialog",
    "com.android.systemui",
    "com.android.storagemanger",
    "com.android.traceur",
    "com.google.android.apps.turbo",
    "com.android.documentsui",
    "com.google.android.ext.services",
    "com.google.android.gms",
    "com.google.android.gsf",
    "com.google.android.gsf.login",
    "com.google.android.packageinstaller",
    "com.google.android.partnersetup",
    "com.google.android.webview",
];

#[derive(Debug, Clone)]
pub struct ProtectedSet {
    names: HashSet<String>,
}

impl Default for ProtectedSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProtectedSet {
    pub fn builtin() -> Self {
        Self {
            names: LOCKED_APPS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 内置列表加上配置中的额外包名
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::builtin();
        set.names.extend(extra.into_iter().map(Into::into));
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
