//! well-known event kinds

use crate::Kind;

macro_rules! known_kinds {
    ($($name:ident = $value:literal,)+) => {
        /// named kinds, anything else is [`KnownKind::Unrecognized`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum KnownKind {
            $($name,)+
            Unrecognized(u16),
        }

        impl KnownKind {
            pub fn as_u16(&self) -> u16 {
                match self {
                    $(KnownKind::$name => $value,)+
                    KnownKind::Unrecognized(value) => *value,
                }
            }
        }

        impl From<Kind> for KnownKind {
            fn from(kind: Kind) -> Self {
                match kind.0 {
                    $($value => KnownKind::$name,)+
                    other => KnownKind::Unrecognized(other),
                }
            }
        }
    };
}

known_kinds! {
    Metadata = 0,
    ShortTextNote = 1,
    RecommendRelay = 2,
    Contacts = 3,
    EncryptedDirectMessage = 4,
    EventDeletion = 5,
    Repost = 6,
    Reaction = 7,
    BadgeAward = 8,
    GenericRepost = 16,
    ChannelCreation = 40,
    ChannelMetadata = 41,
    ChannelMessage = 42,
    ChannelHideMessage = 43,
    ChannelMuteUser = 44,
    FileMetadata = 1063,
    LiveChatMessage = 1311,
    Reporting = 1984,
    Label = 1985,
    CommunityPostApproval = 4550,
    ZapGoal = 9041,
    ZapRequest = 9734,
    Zap = 9735,
    MuteList = 10000,
    PinList = 10001,
    RelayListMetadata = 10002,
    WalletInfo = 13194,
    ClientAuthentication = 22242,
    WalletRequest = 23194,
    WalletResponse = 23195,
    NostrConnect = 24133,
    HttpAuth = 27235,
    Categorized = 30000,
    CategorizedBookmarks = 30001,
    ProfileBadges = 30008,
    BadgeDefinition = 30009,
    CreateOrUpdateStall = 30017,
    CreateOrUpdateProduct = 30018,
    LongFormContent = 30023,
    DraftLongFormContent = 30024,
    ApplicationSpecificData = 30078,
    LiveEvent = 30311,
    UserStatuses = 30315,
    ClassifiedListing = 30402,
    DraftClassifiedListing = 30403,
    DateBasedCalendarEvent = 31922,
    TimeBasedCalendarEvent = 31923,
    Calendar = 31924,
    CalendarEventRsvp = 31925,
    HandlerRecommendation = 31989,
    HandlerInformation = 31990,
    CommunityDefinition = 34550,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds() {
        assert_eq!(Kind(1).known(), KnownKind::ShortTextNote);
        assert_eq!(Kind(22242).known(), KnownKind::ClientAuthentication);
        assert_eq!(Kind(31337).known(), KnownKind::Unrecognized(31337));
        assert_eq!(Kind::from(KnownKind::LongFormContent), Kind(30023));
        assert_eq!(Kind::from(KnownKind::Unrecognized(7777)), Kind(7777));
    }
}
