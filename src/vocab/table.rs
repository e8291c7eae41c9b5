//! Fixed class tables for the tone and syllable output heads.
//!
//! Index order matches the classifier's dense output spaces and must not
//! be reordered: position `i` in each table is the label for output `i`.

/// Tone number carried by each tone-head output index.
pub const TONE_BY_INDEX: [u8; 4] = [3, 2, 4, 1];

/// Pinyin syllable carried by each syllable-head output index.
pub const SYLLABLES: [&str; 410] = [
    "sa", "cao", "shao", "ke", "ken", "chu", "nong", "ao", "huai", "dang",
    "gei", "rang", "mu", "sheng", "liang", "ping", "gua", "fei", "seng", "cui",
    "rua", "bao", "chui", "chuai", "zhen", "zhai", "zuo", "nang", "qiong", "mao",
    "duo", "ca", "shu", "rui", "juan", "he", "zou", "hua", "gui", "xiong",
    "luan", "nen", "zuan", "fu", "yao", "zhang", "gao", "lao", "qing", "sui",
    "zen", "cu", "teng", "o", "guang", "reng", "can", "dai", "kei", "kan",
    "zhua", "lian", "gang", "zhu", "dao", "sou", "da", "xuan", "cuan", "jin",
    "huan", "gen", "mo", "piao", "du", "you", "zhan", "zhei", "cun", "er",
    "que", "gou", "zong", "run", "yuan", "long", "ju", "ben", "bai", "xiu",
    "chuo", "gun", "nei", "cou", "nve", "le", "mian", "ta", "geng", "liu",
    "bing", "qu", "qiao", "dan", "cen", "cai", "zhui", "pin", "sun", "pou",
    "tun", "sha", "si", "na", "nou", "shei", "han", "yo", "jia", "lv",
    "se", "jiu", "wei", "bo", "rong", "ang", "nu", "yue", "xian", "ban",
    "kun", "cang", "eng", "ha", "niao", "san", "niu", "yin", "heng", "qun",
    "jiang", "shuai", "fan", "gan", "xiang", "bang", "hao", "kuang", "jie", "wo",
    "kuan", "ran", "xin", "hong", "lei", "kai", "song", "cheng", "tui", "ai",
    "ting", "zeng", "yu", "fo", "nan", "ze", "wen", "po", "duan", "tao",
    "kui", "sai", "feng", "la", "kua", "te", "men", "shuan", "pao", "ru",
    "rou", "kong", "gai", "suo", "tiao", "biao", "deng", "zai", "shang", "shua",
    "bei", "che", "huang", "pa", "tong", "pi", "chong", "neng", "ce", "xi",
    "chao", "zheng", "zhou", "tang", "tian", "weng", "bu", "xun", "zan", "gu",
    "dei", "nin", "zi", "gong", "ga", "qin", "chou", "yun", "ti", "chuan",
    "zha", "kuai", "wang", "fou", "xie", "e", "yi", "diu", "nun", "tuo",
    "tie", "lan", "qiu", "zhuai", "ci", "man", "ma", "kou", "ceng", "yong",
    "wan", "xu", "chi", "sang", "nian", "shan", "jun", "xue", "ei", "diao",
    "bin", "hei", "ren", "zu", "jian", "ruo", "ning", "zhuan", "mai", "sen",
    "bi", "fen", "pang", "wai", "en", "kao", "shai", "shen", "ding", "di",
    "hen", "hai", "ling", "den", "pie", "jiong", "chang", "pu", "dou", "quan",
    "hang", "mei", "cha", "su", "dia", "ming", "lin", "yang", "tou", "bian",
    "shuang", "zhuo", "a", "chen", "zhe", "pian", "cuo", "li", "wu", "chun",
    "keng", "miao", "guo", "ye", "zang", "qian", "qiang", "shui", "qia", "tai",
    "kuo", "xiao", "chua", "me", "pen", "nai", "an", "jing", "mie", "nao",
    "tan", "qi", "lie", "shun", "xing", "ruan", "hou", "zhi", "lun", "zhao",
    "mang", "pei", "pan", "fang", "lia", "miu", "ou", "leng", "ri", "shi",
    "lve", "ni", "dun", "fa", "qie", "guan", "die", "zhuang", "lai", "dui",
    "zui", "guai", "kang", "chai", "xia", "tu", "nuo", "dong", "ku", "pai",
    "she", "ne", "dian", "ya", "ying", "shou", "lou", "za", "meng", "mou",
    "suan", "re", "zao", "chan", "cong", "yan", "zun", "lu", "jiao", "hui",
    "zhong", "ji", "liao", "ba", "mi", "sao", "rao", "hu", "wa", "de",
    "bie", "zhun", "huo", "nuan", "nv", "luo", "peng", "nie", "ka", "niang",
    "zei", "jue", "ge", "shuo", "beng", "lang", "hun", "tuan", "min", "chuang",
];
